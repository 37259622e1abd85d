//! Common types shared across every fusion pipeline process: sentinel
//! data values, the error type, lat/lon geometry and beam-path math, the
//! coverage-grid language, and epoch-time helpers.

pub mod constants;
pub mod coverage;
pub mod error;
pub mod geo;
pub mod time;

pub use constants::{is_good, is_maskable, DATA_UNAVAILABLE, MISSING_DATA, RANGE_FOLDED};
pub use coverage::LLCoverageArea;
pub use error::{io_error, FusionError, FusionResult};
pub use geo::{Project, EARTH_RADIUS_KM, EFFECTIVE_EARTH_RADIUS_KM, LL, LLH};
pub use time::{cutoff_seconds, to_epoch_seconds, EpochSeconds};
