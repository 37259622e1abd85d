//! A single radar/moment's virtual elevation volume: every tilt
//! currently known for that (radar, moment) pair, kept sorted by
//! elevation angle so a resolver can binary-search for the two real
//! tilts enclosing any target elevation.

use fusion_common::time::EpochSeconds;
use fusion_datatypes::radial_set::RadialSet;

struct Tilt {
    elevation_deg: f64,
    received_at: EpochSeconds,
    radial_set: RadialSet,
}

/// The four tilts a resolver typically wants around a target elevation:
/// the immediately enclosing pair, and the next tilt out on each side
/// (used by resolvers that blend across a wider spread, e.g. the lak
/// resolver's `2ndLower`/`2ndUpper` terms).
#[derive(Default)]
pub struct EnclosingTilts<'a> {
    pub lower: Option<&'a RadialSet>,
    pub upper: Option<&'a RadialSet>,
    pub second_lower: Option<&'a RadialSet>,
    pub second_upper: Option<&'a RadialSet>,
}

#[derive(Default)]
pub struct VirtualVolume {
    tilts: Vec<Tilt>,
}

impl VirtualVolume {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tilts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tilts.is_empty()
    }

    /// Insert or replace the tilt at this elevation, maintaining
    /// ascending elevation order. A new `RadialSet` at an elevation
    /// already present (a re-scan of the same tilt) replaces the old
    /// one rather than accumulating duplicates.
    pub fn add(&mut self, radial_set: RadialSet, received_at: EpochSeconds) {
        let elevation_deg = radial_set.elevation_deg;
        match self
            .tilts
            .binary_search_by(|t| t.elevation_deg.partial_cmp(&elevation_deg).unwrap())
        {
            Ok(idx) => {
                self.tilts[idx] = Tilt {
                    elevation_deg,
                    received_at,
                    radial_set,
                };
            }
            Err(idx) => {
                self.tilts.insert(
                    idx,
                    Tilt {
                        elevation_deg,
                        received_at,
                        radial_set,
                    },
                );
            }
        }
    }

    /// Drop tilts last updated before `cutoff`. Returns the number
    /// removed, for heartbeat logging.
    pub fn expire(&mut self, cutoff: EpochSeconds) -> usize {
        let before = self.tilts.len();
        self.tilts.retain(|t| t.received_at >= cutoff);
        before - self.tilts.len()
    }

    /// Find the tilts bracketing `target_elev_deg`. `lower` is the
    /// highest-elevation tilt at or below the target; `upper` is the
    /// lowest-elevation tilt above it.
    pub fn query_enclosing(&self, target_elev_deg: f64) -> EnclosingTilts<'_> {
        let upper_idx = self
            .tilts
            .partition_point(|t| t.elevation_deg <= target_elev_deg);
        let lower_idx = upper_idx.checked_sub(1);

        EnclosingTilts {
            lower: lower_idx.map(|i| &self.tilts[i].radial_set),
            upper: self.tilts.get(upper_idx).map(|t| &t.radial_set),
            second_lower: lower_idx
                .and_then(|i| i.checked_sub(1))
                .map(|i| &self.tilts[i].radial_set),
            second_upper: self.tilts.get(upper_idx + 1).map(|t| &t.radial_set),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_common::geo::LLH;

    fn rs(elev: f64) -> RadialSet {
        RadialSet::new("KTLX", LLH::new(35.33, -97.27, 417.0), elev, 1000.0, 4, 4)
    }

    #[test]
    fn add_keeps_tilts_sorted_by_elevation() {
        let mut v = VirtualVolume::new();
        v.add(rs(2.4), 100);
        v.add(rs(0.5), 100);
        v.add(rs(1.5), 100);
        let enclosing = v.query_enclosing(1.0);
        assert_eq!(enclosing.lower.unwrap().elevation_deg, 0.5);
        assert_eq!(enclosing.upper.unwrap().elevation_deg, 1.5);
    }

    #[test]
    fn rescanning_a_tilt_replaces_it_rather_than_duplicating() {
        let mut v = VirtualVolume::new();
        v.add(rs(0.5), 100);
        v.add(rs(0.5), 200);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn query_reports_second_enclosing_tilts() {
        let mut v = VirtualVolume::new();
        for e in [0.5, 1.5, 2.4, 3.4] {
            v.add(rs(e), 100);
        }
        let enclosing = v.query_enclosing(2.0);
        assert_eq!(enclosing.lower.unwrap().elevation_deg, 1.5);
        assert_eq!(enclosing.upper.unwrap().elevation_deg, 2.4);
        assert_eq!(enclosing.second_lower.unwrap().elevation_deg, 0.5);
        assert_eq!(enclosing.second_upper.unwrap().elevation_deg, 3.4);
    }

    #[test]
    fn expire_drops_stale_tilts() {
        let mut v = VirtualVolume::new();
        v.add(rs(0.5), 100);
        v.add(rs(1.5), 200);
        let removed = v.expire(150);
        assert_eq!(removed, 1);
        assert_eq!(v.len(), 1);
    }
}
