//! Per-radar projection caches.
//!
//! Every cell of a CONUS-scale output grid needs the same handful of
//! trig results recomputed for every tilt of every moment of every
//! radar: a ground-range/azimuth pair relative to the radar, and the
//! beam-path height at a candidate elevation. These caches amortize
//! that work across a radar's full volume so a resolver pass touches
//! `sin`/`cos`/`atan2` once per cell per radar, not once per cell per
//! tilt.

pub mod az_ran_elev_cache;
pub mod level_same_cache;
pub mod sincos_cache;

pub use az_ran_elev_cache::{AzRanElevCache, CellGeometry};
pub use level_same_cache::LevelSameCache;
pub use sincos_cache::SinCosLatLonCache;
