use std::{
    collections::VecDeque,
    io::{BufRead, BufReader, Read},
};

use serde::Deserialize;

use crate::{
    error::{DomainError, Error, Result},
    translate::PageSplit,
};

const BYTES_PER_KB: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    pub trace: String,
    pub memory_kb: u64,
    pub page_kb: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub frames: usize,
    pub split: PageSplit,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub runs: Vec<RunConfig>,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl RunConfig {
    pub fn geometry(&self) -> Result<Geometry> {
        let (memory_kb, page_kb) = (self.memory_kb, self.page_kb);
        if page_kb == 0 {
            return Err(DomainError::ZeroPageSize.into());
        }
        if !page_kb.is_power_of_two() {
            return Err(DomainError::PageSizeNotPowerOfTwo { page_kb }.into());
        }
        if memory_kb < page_kb {
            return Err(DomainError::MemoryTooSmall { memory_kb, page_kb }.into());
        }
        if memory_kb % page_kb != 0 {
            return Err(DomainError::MemoryNotDivisible { memory_kb, page_kb }.into());
        }

        // page_kb * 1024 may not fit in a u64, but its log2 always does
        let offset_bits = page_kb.ilog2() + BYTES_PER_KB.ilog2();
        let split = PageSplit::new(offset_bits as i64)?;
        let frames = usize::try_from(memory_kb / page_kb)
            .map_err(|_| Error::Config(format!("{} frames do not fit in memory", memory_kb / page_kb)))?;
        Ok(Geometry { frames, split })
    }
}

/// `trace memory_kb page_kb` triples, parsed as soon as each one is complete.
pub struct Triples<R> {
    reader: R,
    words: VecDeque<String>,
    done: bool,
}

impl<R: BufRead> Triples<R> {
    pub fn new(reader: R) -> Self {
        Triples {
            reader,
            words: VecDeque::new(),
            done: false,
        }
    }

    fn parse(&mut self) -> Result<RunConfig> {
        let mut next = || self.words.pop_front().unwrap_or_default();
        let (trace, memory, page) = (next(), next(), next());
        let size = |field: &str, value: &str| {
            value
                .parse::<u64>()
                .map_err(|_| Error::Config(format!("{field} for {trace} is not a size: {value:?}")))
        };
        Ok(RunConfig {
            memory_kb: size("memory size", &memory)?,
            page_kb: size("page size", &page)?,
            trace,
        })
    }
}

impl<R: BufRead> Iterator for Triples<R> {
    type Item = Result<RunConfig>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut line = String::new();
        while self.words.len() < 3 {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.done = true;
                    if self.words.is_empty() {
                        return None;
                    }
                    let partial: Vec<String> = self.words.drain(..).collect();
                    return Some(Err(Error::Config(format!(
                        "incomplete run description {partial:?}, expected <trace> <memory_kb> <page_kb>"
                    ))));
                }
                Ok(_) => self
                    .words
                    .extend(line.split_whitespace().map(str::to_owned)),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            }
        }
        Some(self.parse())
    }
}

/// Reads every triple until the input runs out.
pub fn read_triples<R: Read>(reader: R) -> Result<Vec<RunConfig>> {
    Triples::new(BufReader::new(reader)).collect()
}
