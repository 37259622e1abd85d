//! How a full output grid is split across Stage 1 workers and put back
//! together downstream: `PartitionInfo` routes individual cells to a
//! partition; `TileJoin` reassembles per-partition outputs into one grid.

pub mod partition_info;
pub mod tile_join;

pub use partition_info::PartitionInfo;
pub use tile_join::TileJoin;
