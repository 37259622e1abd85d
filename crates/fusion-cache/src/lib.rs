//! The binary artifact exchange between Stage 1 and Roster: Stage 1
//! writes a `.cache` file of nearest ranges per radar, Roster reads
//! every radar's cache to build the global nearest-N mask and writes
//! back a `.mask` file per radar for Stage 1 to gate its Stage 2
//! output on.

pub mod fingerprint;
pub mod mask_file;
pub mod range_cache;
pub mod roster;

pub use fingerprint::grid_fingerprint;
pub use mask_file::MaskFile;
pub use range_cache::RangeCacheFile;
pub use roster::{build_masks, NearestN, SourceRanges};
