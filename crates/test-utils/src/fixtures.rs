//! Common test fixtures for the fusion pipeline.
//!
//! This module provides pre-defined test data that represents common
//! scenarios in multi-radar mosaicking: radar site locations, a small
//! coverage area sized for fast unit tests, and the cutoff/window
//! constants Stage 2 expects.

use fusion_common::coverage::LLCoverageArea;
use fusion_common::geo::LLH;

/// Real radar site locations, useful whenever a test needs more than one
/// distinct, plausible center point.
pub mod radars {
    use super::LLH;

    /// KTLX, Twin Lakes OK.
    pub fn ktlx() -> LLH {
        LLH::new(35.333_06, -97.277_94, 381.0)
    }

    /// KVNX, Vance AFB OK — roughly 120km northwest of KTLX, handy for
    /// overlap/nearest-N tests.
    pub fn kvnx() -> LLH {
        LLH::new(36.740_75, -98.127_72, 369.0)
    }

    /// KTLX's beamwidth and gate spacing, matching the original system's
    /// fake-radar-data generator defaults.
    pub const BEAM_WIDTH_DEG: f64 = 1.0;
    pub const GATE_WIDTH_M: f64 = 1000.0;
    pub const AZIMUTH_SPACING_DEG: f64 = 1.0;
}

/// Common reference times for tests, as epoch seconds.
pub mod time {
    /// A fixed reference time (2024-01-15T12:00:00Z).
    pub const REFERENCE_TIME: i64 = 1_705_319_600;

    /// Default Stage 2 time-to-live for an observation before it's
    /// dropped from the merge database.
    pub const DEFAULT_CUTOFF_SECS: i64 = 600;

    /// Default history window TileJoin waits before compositing a
    /// partially-filled frame early.
    pub const DEFAULT_HISTORY_WINDOW_SECS: i64 = 300;
}

/// Small coverage areas sized for fast unit tests rather than full CONUS
/// runs.
pub mod areas {
    use super::LLCoverageArea;

    /// A 20x20 cell area centered roughly on KTLX/KVNX.
    pub fn small() -> LLCoverageArea {
        let mut area = LLCoverageArea::default();
        area.set(37.0, -99.0, 35.0, -97.0, 0.1, 0.1, 20, 20);
        area
    }

    /// A single-cell area, useful for resolver/merge-database tests that
    /// only care about one `(x, y, z)` target.
    pub fn single_cell() -> LLCoverageArea {
        let mut area = LLCoverageArea::default();
        area.set(35.34, -97.28, 35.33, -97.27, 0.01, 0.01, 1, 1);
        area
    }
}
