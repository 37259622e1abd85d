//! The virtual elevation volume: a time-expiring, elevation-sorted
//! collection of a radar's tilts, kept one per (radar, moment) pair so
//! a resolver can ask "which real tilts bracket this target elevation"
//! without ever touching a full polar sweep directly.

pub mod manager;
pub mod volume;

pub use manager::{VolumeKey, VolumeManager};
pub use volume::{EnclosingTilts, VirtualVolume};
