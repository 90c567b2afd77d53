//! Second-chance (clock) page replacement over address traces.

pub mod config;
pub mod engine;
pub mod error;
pub mod sim;
pub mod trace;
pub mod translate;

pub use engine::{Access, ClockEngine};
pub use error::{DomainError, Error, Result};
pub use translate::{translate, PageId};
