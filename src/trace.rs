use std::{
    fs,
    io::{self, BufRead, BufReader, Read},
    path::Path,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{Receiver, Sender};
use log::debug;
use xz2::read::XzDecoder;

pub type TokenBlock = io::Result<Vec<String>>;

/// Address tokens read on a background thread and handed over in blocks.
pub struct Trace {
    pub rec: Receiver<TokenBlock>,
    _thread: JoinHandle<()>,
}

impl Trace {
    pub fn open(path: &Path, tokens_per_block: usize, blocks_per_queue: usize) -> io::Result<Trace> {
        let stream = fs::File::open(path)?;
        let compressed = path.extension().is_some_and(|ext| ext == "xz");
        debug!("reading trace {} (xz: {compressed})", path.display());
        Ok(if compressed {
            Trace::spawn(XzDecoder::new(stream), tokens_per_block, blocks_per_queue)
        } else {
            Trace::spawn(stream, tokens_per_block, blocks_per_queue)
        })
    }

    pub fn spawn<R>(reader: R, tokens_per_block: usize, blocks_per_queue: usize) -> Trace
    where
        R: Read + Send + 'static,
    {
        let (sender, receiver) = crossbeam::channel::bounded(blocks_per_queue.max(1));
        let tokens_per_block = tokens_per_block.max(1);
        let t = thread::spawn(move || Trace::run_thread(reader, tokens_per_block, sender));

        Trace {
            rec: receiver,
            _thread: t,
        }
    }

    /// Every token in trace order. Stops after the first read error.
    pub fn tokens(&self) -> impl Iterator<Item = io::Result<String>> + '_ {
        self.rec.iter().flat_map(|block| {
            let (tokens, err) = match block {
                Ok(tokens) => (tokens, None),
                Err(err) => (Vec::new(), Some(err)),
            };
            tokens.into_iter().map(Ok).chain(err.map(Err))
        })
    }

    fn run_thread<R: Read>(reader: R, tokens_per_block: usize, queue: Sender<TokenBlock>) {
        let mut reader = BufReader::new(reader);
        let mut block = Vec::with_capacity(tokens_per_block);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    if !block.is_empty() && queue.send(Ok(block)).is_err() {
                        return;
                    }
                    let _ = queue.send(Err(err));
                    return;
                }
            }
            for token in line.split_whitespace() {
                block.push(token.to_owned());
                if block.len() == tokens_per_block {
                    let full = std::mem::replace(&mut block, Vec::with_capacity(tokens_per_block));
                    if queue.send(Ok(full)).is_err() {
                        return;
                    }
                }
            }
        }
        if !block.is_empty() {
            let _ = queue.send(Ok(block));
        }
    }
}
