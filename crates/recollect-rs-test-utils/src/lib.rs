//! Test helpers shared across Recollect crates.

pub mod backend;
pub mod similarity;

pub use backend::{FailingBackend, RecordingBackend, SlowBackend, StallingBackend};
pub use similarity::{FailingSimilarity, FixedSimilarity, MiscountSimilarity, SlowSimilarity};
