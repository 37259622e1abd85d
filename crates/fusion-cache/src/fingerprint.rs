//! A deterministic fingerprint of a grid definition, stamped into every
//! `.cache`/`.mask` file so Roster and Stage 1 can detect a grid
//! definition change (a restart with a new `-grid` flag, say) rather
//! than silently merging stale cells from an incompatible layout.

use fusion_common::coverage::LLCoverageArea;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hash the grid's corners, spacing, extents, and height layers. Two
/// `LLCoverageArea`s with the same fingerprint address the same cells
/// the same way; anything else (start offset, tile size) is allowed to
/// differ between a global grid and its per-radar sub-area.
pub fn grid_fingerprint(area: &LLCoverageArea) -> u64 {
    let mut h = FNV_OFFSET;
    h = fnv1a(h, &area.nw_lat_deg.to_bits().to_le_bytes());
    h = fnv1a(h, &area.nw_lon_deg.to_bits().to_le_bytes());
    h = fnv1a(h, &area.se_lat_deg.to_bits().to_le_bytes());
    h = fnv1a(h, &area.se_lon_deg.to_bits().to_le_bytes());
    h = fnv1a(h, &area.lat_spacing_deg.to_bits().to_le_bytes());
    h = fnv1a(h, &area.lon_spacing_deg.to_bits().to_le_bytes());
    for height in &area.heights_km {
        h = fnv1a(h, &height.to_bits().to_le_bytes());
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_grids_fingerprint_identically() {
        let mut a = LLCoverageArea::default();
        a.set(55.0, -130.0, 20.0, -60.0, 0.01, 0.01, 100, 100);
        let mut b = LLCoverageArea::default();
        b.set(55.0, -130.0, 20.0, -60.0, 0.01, 0.01, 100, 100);
        assert_eq!(grid_fingerprint(&a), grid_fingerprint(&b));
    }

    #[test]
    fn different_spacing_changes_the_fingerprint() {
        let mut a = LLCoverageArea::default();
        a.set(55.0, -130.0, 20.0, -60.0, 0.01, 0.01, 100, 100);
        let mut b = LLCoverageArea::default();
        b.set(55.0, -130.0, 20.0, -60.0, 0.02, 0.02, 50, 50);
        assert_ne!(grid_fingerprint(&a), grid_fingerprint(&b));
    }
}
