//! The Stage 2 merge engine: ingests `Stage2Message` frames from every
//! radar covering a partition, reconciles them with the union-merge
//! rule, and finalizes a weighted-average output grid on demand.

pub mod database;

pub use database::{MergeDatabase, MergeStats, MissingObs, ValueObs};
