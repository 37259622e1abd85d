//! The Stage 1 -> Stage 2 wire transport: a run-length-encoded
//! `(value, weight)` table plus a separate run-length-encoded missing
//! table, so a mostly-empty CONUS-scale partition never needs to
//! serialize its unobserved cells at all.

pub mod builder;
pub mod grid_file;
pub mod message;

pub use builder::Stage2MessageBuilder;
pub use grid_file::MergedGridFile;
pub use message::{MissingRun, Stage2Message, ValueWeightRun};
