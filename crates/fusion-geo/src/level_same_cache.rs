//! Per-cell "did the enclosing tilts change" cache.
//!
//! A resolver pass queries, per output cell, the `RadialSet`s whose
//! elevation angles bound that cell's target height. Which two tilts
//! those are can change cell to cell (ground range varies the beam
//! height at a fixed layer height) but is usually stable between
//! consecutive volumes for the same radar. This cache remembers the
//! last lower/upper tilt identity seen at each cell so a resolver can
//! skip recomputing azimuth/gate indices when nothing enclosing the
//! cell has actually changed.

use fusion_datatypes::radial_set::RadialSetId;

#[derive(Debug, Clone, PartialEq)]
pub struct LevelSameCache {
    num_lat: usize,
    num_lon: usize,
    lower_id: Vec<RadialSetId>,
    upper_id: Vec<RadialSetId>,
    lower2_id: Vec<RadialSetId>,
    upper2_id: Vec<RadialSetId>,
}

impl LevelSameCache {
    pub fn new(num_lat: usize, num_lon: usize) -> Self {
        Self {
            num_lat,
            num_lon,
            lower_id: vec![0; num_lat * num_lon],
            upper_id: vec![0; num_lat * num_lon],
            lower2_id: vec![0; num_lat * num_lon],
            upper2_id: vec![0; num_lat * num_lon],
        }
    }

    fn index(&self, y: usize, x: usize) -> usize {
        y * self.num_lon + x
    }

    /// Record the four enclosing tilt ids just used for cell `(y, x)`
    /// (the immediate lower/upper plus the 2nd-neighbor tilts the `lak`
    /// resolver also consumes) and report whether all four are
    /// unchanged from the previous call. `0` for `lower_id`/`upper_id`
    /// always reports "changed", since it means no enclosing tilt was
    /// found (nothing to reuse).
    pub fn check_and_update(
        &mut self,
        y: usize,
        x: usize,
        lower_id: RadialSetId,
        upper_id: RadialSetId,
        lower2_id: RadialSetId,
        upper2_id: RadialSetId,
    ) -> bool {
        let i = self.index(y, x);
        let same = lower_id != 0
            && upper_id != 0
            && self.lower_id[i] == lower_id
            && self.upper_id[i] == upper_id
            && self.lower2_id[i] == lower2_id
            && self.upper2_id[i] == upper2_id;
        self.lower_id[i] = lower_id;
        self.upper_id[i] = upper_id;
        self.lower2_id[i] = lower2_id;
        self.upper2_id[i] = upper2_id;
        same
    }

    pub fn reset(&mut self) {
        self.lower_id.fill(0);
        self.upper_id.fill(0);
        self.lower2_id.fill(0);
        self.upper2_id.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_is_always_a_change() {
        let mut cache = LevelSameCache::new(4, 4);
        assert!(!cache.check_and_update(1, 1, 3, 4, 2, 5));
    }

    #[test]
    fn repeated_identical_ids_report_same() {
        let mut cache = LevelSameCache::new(4, 4);
        cache.check_and_update(1, 1, 3, 4, 2, 5);
        assert!(cache.check_and_update(1, 1, 3, 4, 2, 5));
        assert!(!cache.check_and_update(1, 1, 3, 5, 2, 5));
    }

    #[test]
    fn zero_ids_never_report_same() {
        let mut cache = LevelSameCache::new(2, 2);
        cache.check_and_update(0, 0, 0, 0, 0, 0);
        assert!(!cache.check_and_update(0, 0, 0, 0, 0, 0));
    }

    #[test]
    fn second_neighbor_tilt_change_alone_reports_a_change() {
        let mut cache = LevelSameCache::new(2, 2);
        cache.check_and_update(0, 0, 3, 4, 2, 5);
        assert!(!cache.check_and_update(0, 0, 3, 4, 9, 5));
    }
}
