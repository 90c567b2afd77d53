use std::io;

use thiserror::Error;

/// Configuration values that can never describe a valid simulation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("frame count must be at least 1")]
    ZeroFrames,
    #[error("a table of {frames} frames cannot be allocated")]
    TooManyFrames { frames: usize },
    #[error("offset bits must lie in 0..{width}, got {bits}")]
    OffsetBits { bits: i64, width: u32 },
    #[error("page size must be non-zero")]
    ZeroPageSize,
    #[error("page size {page_kb}KB is not a power of two")]
    PageSizeNotPowerOfTwo { page_kb: u64 },
    #[error("memory size {memory_kb}KB is not a multiple of page size {page_kb}KB")]
    MemoryNotDivisible { memory_kb: u64, page_kb: u64 },
    #[error("memory size {memory_kb}KB is smaller than one {page_kb}KB page")]
    MemoryTooSmall { memory_kb: u64, page_kb: u64 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed address token {token:?}: {reason}")]
    Parse { token: String, reason: &'static str },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("bad run configuration: {0}")]
    Config(String),
    #[error("simulation of {0} panicked")]
    Panicked(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
