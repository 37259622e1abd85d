//! Sentinel data values shared by the whole pipeline.
//!
//! Radar moments carry three special float values instead of an `Option`
//! wrapper, mirroring how the original merger packs grids of plain
//! `f32`/`f64` into files and shared memory without a parallel validity
//! mask. Keeping the sentinel representation (rather than switching to
//! `Option<f32>`) avoids doubling the memory footprint of the CONUS-scale
//! grids described in the design.

/// A gate/cell that was never sampled or fell outside all beams.
pub const DATA_UNAVAILABLE: f32 = -99900.0;

/// A gate/cell that was sampled but the value is background/no-weather.
pub const MISSING_DATA: f32 = -99901.0;

/// A gate whose return was range-folded (second-trip echo).
pub const RANGE_FOLDED: f32 = -99903.0;

/// A value is "good" (a usable measurement) iff it isn't one of the
/// sentinels above.
#[inline]
pub fn is_good(v: f32) -> bool {
    v != DATA_UNAVAILABLE && v != MISSING_DATA && v != RANGE_FOLDED
}

/// A value is "maskable" iff it could legitimately smear into a
/// `MissingData` output: anything except unavailable or range-folded.
#[inline]
pub fn is_maskable(v: f32) -> bool {
    v != DATA_UNAVAILABLE && v != RANGE_FOLDED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn good_excludes_all_sentinels() {
        assert!(!is_good(DATA_UNAVAILABLE));
        assert!(!is_good(MISSING_DATA));
        assert!(!is_good(RANGE_FOLDED));
        assert!(is_good(17.5));
    }

    #[test]
    fn maskable_excludes_unavailable_and_folded_only() {
        assert!(!is_maskable(DATA_UNAVAILABLE));
        assert!(!is_maskable(RANGE_FOLDED));
        assert!(is_maskable(MISSING_DATA));
        assert!(is_maskable(12.0));
    }
}
