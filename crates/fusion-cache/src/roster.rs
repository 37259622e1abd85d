//! Roster's per-tick nearest-N merge: scan every radar's `.cache` ranges
//! into two parallel global arrays, keeping the `N` smallest ranges per
//! cell in sorted order by straight insertion sort, then walk the
//! result once more to stamp each contributing radar's local `.mask`
//! bitset.

use std::collections::HashMap;

use fusion_containers::{Bitset, DimensionMapper};

/// One radar's nearest-range cache for this tick, already read off disk
/// (`RangeCacheFile`) and assigned a process-local integer id.
pub struct SourceRanges {
    pub name: String,
    /// Monotonic id, 0 reserved to mean "no source" in the nearest-N
    /// arrays; the allocator skips 0 on wraparound.
    pub id: u32,
    pub start_x: usize,
    pub start_y: usize,
    pub num_x: usize,
    pub num_y: usize,
    pub num_z: usize,
    /// Local to this radar's sub-area, `(x, y, z)` row-major with `z`
    /// slowest, matching `RangeCacheFile::ranges_km`.
    pub ranges_km: Vec<f32>,
}

/// The global `(id, range)` nearest-N table for one tick over the full
/// output grid.
pub struct NearestN {
    dims: DimensionMapper,
    nearest: usize,
    keys: Vec<u32>,
    ranges: Vec<f32>,
}

impl NearestN {
    pub fn new(full_num_x: usize, full_num_y: usize, full_num_z: usize, nearest: usize) -> Self {
        let dims = DimensionMapper::new(vec![full_num_x, full_num_y, full_num_z]);
        let slots = dims.size() * nearest;
        Self {
            dims,
            nearest,
            keys: vec![0u32; slots],
            ranges: vec![f32::INFINITY; slots],
        }
    }

    /// Insertion-sort one `(id, range_km)` observation into the sorted
    /// nearest-N list for global cell `(x, y, z)`, shifting longer
    /// ranges down and dropping the observation if it doesn't beat the
    /// current Nth-nearest.
    pub fn insert(&mut self, x: usize, y: usize, z: usize, id: u32, range_km: f32) {
        let cell = self.dims.index_3d(x, y, z);
        let base = cell * self.nearest;
        let slot = &mut self.ranges[base..base + self.nearest];

        let mut pos = self.nearest;
        for (i, &r) in slot.iter().enumerate() {
            if range_km < r {
                pos = i;
                break;
            }
        }
        if pos == self.nearest {
            return;
        }
        for i in (pos + 1..self.nearest).rev() {
            self.ranges[base + i] = self.ranges[base + i - 1];
            self.keys[base + i] = self.keys[base + i - 1];
        }
        self.ranges[base + pos] = range_km;
        self.keys[base + pos] = id;
    }

    /// Merge every source's sub-area ranges into this global table.
    pub fn insert_source(&mut self, source: &SourceRanges) {
        let local = DimensionMapper::new(vec![source.num_x, source.num_y, source.num_z]);
        for z in 0..source.num_z {
            for y in 0..source.num_y {
                for x in 0..source.num_x {
                    let r = source.ranges_km[local.index_3d(x, y, z)];
                    if !r.is_finite() {
                        continue;
                    }
                    self.insert(source.start_x + x, source.start_y + y, z, source.id, r);
                }
            }
        }
    }

    pub fn nearest_ids(&self, x: usize, y: usize, z: usize) -> &[u32] {
        let cell = self.dims.index_3d(x, y, z);
        let base = cell * self.nearest;
        &self.keys[base..base + self.nearest]
    }

    pub fn nearest_ranges(&self, x: usize, y: usize, z: usize) -> &[f32] {
        let cell = self.dims.index_3d(x, y, z);
        let base = cell * self.nearest;
        &self.ranges[base..base + self.nearest]
    }
}

/// Run the full nearest-N merge then mask pass for one tick, returning
/// each source's local occupancy mask. A source absent from `sources`
/// (it timed out, or is off this tick) simply gets no entry back — the
/// caller deletes its stale `.mask` file per the static/dynamic policy.
pub fn build_masks(
    full_num_x: usize,
    full_num_y: usize,
    full_num_z: usize,
    nearest: usize,
    sources: &[SourceRanges],
) -> HashMap<String, Bitset> {
    let mut table = NearestN::new(full_num_x, full_num_y, full_num_z, nearest);
    for source in sources {
        table.insert_source(source);
    }

    let id_to_source: HashMap<u32, &SourceRanges> = sources.iter().map(|s| (s.id, s)).collect();
    let mut masks: HashMap<String, Bitset> = sources
        .iter()
        .map(|s| {
            (
                s.name.clone(),
                Bitset::with_dims(DimensionMapper::new(vec![s.num_x, s.num_y, s.num_z]), 1),
            )
        })
        .collect();

    for z in 0..full_num_z {
        for y in 0..full_num_y {
            for x in 0..full_num_x {
                for &id in table.nearest_ids(x, y, z) {
                    if id == 0 {
                        continue;
                    }
                    let Some(source) = id_to_source.get(&id) else { continue };
                    if x < source.start_x || y < source.start_y {
                        continue;
                    }
                    let (lx, ly) = (x - source.start_x, y - source.start_y);
                    if lx >= source.num_x || ly >= source.num_y {
                        continue;
                    }
                    let mask = masks.get_mut(&source.name).expect("mask allocated per source");
                    mask.set1_3d(lx, ly, z);
                }
            }
        }
    }

    masks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, id: u32, range: f32) -> SourceRanges {
        SourceRanges {
            name: name.to_string(),
            id,
            start_x: 0,
            start_y: 0,
            num_x: 200,
            num_y: 200,
            num_z: 1,
            ranges_km: {
                let mut v = vec![f32::INFINITY; 200 * 200];
                v[100 * 200 + 100] = range;
                v
            },
        }
    }

    #[test]
    fn nearest_n_insertion_sort_orders_by_range() {
        // S5: three sources report {120, 80, 200} km at one cell with N=3.
        let mut table = NearestN::new(200, 200, 1, 3);
        let sources = [source("S1", 1, 120.0), source("S2", 2, 80.0), source("S3", 3, 200.0)];
        for s in &sources {
            table.insert_source(s);
        }
        assert_eq!(table.nearest_ids(100, 100, 0), &[2, 1, 3]);
        assert_eq!(table.nearest_ranges(100, 100, 0), &[80.0, 120.0, 200.0]);
    }

    #[test]
    fn fourth_source_beyond_n_is_dropped() {
        let mut table = NearestN::new(200, 200, 1, 3);
        let sources = [
            source("S1", 1, 120.0),
            source("S2", 2, 80.0),
            source("S3", 3, 200.0),
            source("S4", 4, 50.0),
        ];
        for s in &sources {
            table.insert_source(s);
        }
        assert_eq!(table.nearest_ids(100, 100, 0), &[4, 2, 1]);
    }

    #[test]
    fn mask_pass_sets_bits_for_every_nearest_contributor() {
        let sources = vec![source("S1", 1, 120.0), source("S2", 2, 80.0), source("S3", 3, 200.0)];
        let masks = build_masks(200, 200, 1, 3, &sources);
        for name in ["S1", "S2", "S3"] {
            let mask = &masks[name];
            assert!(mask.is_set1(mask.index_3d(100, 100, 0)));
            assert!(!mask.is_set1(mask.index_3d(0, 0, 0)));
        }
    }
}
