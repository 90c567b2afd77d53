use log::trace;
use serde::Serialize;

use crate::{
    error::{DomainError, Result},
    translate::PageId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Hit,
    Fault,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub page: Option<PageId>,
    pub referenced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub frames: usize,
    pub hits: u64,
    pub faults: u64,
    pub evictions: u64,
}

/// Outcome of one clock sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Victim {
    frame: usize,
    examined: usize,
}

/// Second-chance replacement over a fixed table of physical frames.
///
/// Lookups scan the table in frame order; only victim selection moves the
/// clock hand. A frame that is passed over by the hand loses its reference
/// bit, and the first frame found without one is replaced.
#[derive(Debug, Clone)]
pub struct ClockEngine {
    frames: Vec<Frame>,
    hand: usize,
    hits: u64,
    faults: u64,
    evictions: u64,
}

impl ClockEngine {
    pub fn new(n_frames: usize) -> Result<Self> {
        if n_frames == 0 {
            return Err(DomainError::ZeroFrames.into());
        }
        let mut frames = Vec::new();
        frames
            .try_reserve_exact(n_frames)
            .map_err(|_| DomainError::TooManyFrames { frames: n_frames })?;
        frames.resize(n_frames, Frame::default());
        Ok(ClockEngine {
            frames,
            hand: 0,
            hits: 0,
            faults: 0,
            evictions: 0,
        })
    }

    pub fn process(&mut self, page: PageId) -> Access {
        if self.lookup(page) {
            self.hits += 1;
            return Access::Hit;
        }

        self.faults += 1;
        let victim = self.select_victim();
        let frame = &mut self.frames[victim.frame];
        if let Some(old) = frame.page {
            self.evictions += 1;
            trace!(
                "evict page {old:#x} from frame {} for {page:#x} after {} examined",
                victim.frame,
                victim.examined
            );
        }
        frame.page = Some(page);
        frame.referenced = true;
        Access::Fault
    }

    fn lookup(&mut self, page: PageId) -> bool {
        match self.frames.iter_mut().find(|f| f.page == Some(page)) {
            Some(frame) => {
                frame.referenced = true;
                true
            }
            None => false,
        }
    }

    /// Sweeps from the hand, clearing reference bits, until it reaches a frame
    /// without one. Leaves the hand one past the victim.
    fn select_victim(&mut self) -> Victim {
        let n_frames = self.frames.len();
        let mut examined = 0;
        loop {
            let idx = self.hand;
            let frame = &mut self.frames[idx];
            self.hand = (idx + 1) % n_frames;
            examined += 1;
            if !frame.referenced {
                return Victim {
                    frame: idx,
                    examined,
                };
            }
            frame.referenced = false;
        }
    }

    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    pub fn hand(&self) -> usize {
        self.hand
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn resident(&self, page: PageId) -> bool {
        self.frames.iter().any(|f| f.page == Some(page))
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn faults(&self) -> u64 {
        self.faults
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            frames: self.frames.len(),
            hits: self.hits,
            faults: self.faults,
            evictions: self.evictions,
        }
    }
}
