//! The Stage 2 point-cloud merge database: one observation store per
//! source radar, plus the global missing-time tracker `mergeTo` reads to
//! tell "nobody has seen this cell yet" apart from "somebody saw this
//! cell as background, no echo". Cells no source has ever reported are
//! simply absent from every map here, rather than carrying an explicit
//! `DATA_UNAVAILABLE` entry — the sparse grid model the whole pipeline
//! already uses upstream of this point.

use std::collections::{HashMap, HashSet};

use fusion_common::constants::{DATA_UNAVAILABLE, MISSING_DATA};
use fusion_common::time::EpochSeconds;
use fusion_stage2::Stage2Message;

pub type CellKey = (u32, u32, u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueObs {
    pub value: f32,
    pub weight: f32,
    pub time: EpochSeconds,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissingObs {
    pub time: EpochSeconds,
}

#[derive(Debug, Clone, Default)]
struct SourceStore {
    values: HashMap<CellKey, ValueObs>,
    missing: HashMap<CellKey, MissingObs>,
}

/// Per-ingest counters for the union-merge pass, logged by the Stage 2
/// binary after each incoming frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub new_values: usize,
    pub new_missing: usize,
    pub restored: usize,
    pub dropped: usize,
}

/// Owns every radar source's observations for one partition. `mergeTo`
/// reads across all sources at once; `ingest` only ever touches the one
/// source named in the incoming message.
#[derive(Debug, Default)]
pub struct MergeDatabase {
    sources: HashMap<String, SourceStore>,
    missing_times: HashMap<CellKey, EpochSeconds>,
}

impl MergeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one source's new frame. Cells the frame didn't touch this
    /// time are restored if their last observation is still within
    /// `cutoff`, dropped otherwise.
    pub fn ingest(&mut self, msg: &Stage2Message, cutoff: EpochSeconds) -> MergeStats {
        let store = self.sources.entry(msg.radar_name.clone()).or_default();
        let mut haves: HashSet<CellKey> = HashSet::new();
        let mut stats = MergeStats::default();

        for (x, y, z, value, weight) in msg.iter_observations() {
            let key = (x, y, z);
            haves.insert(key);
            store.values.insert(key, ValueObs { value, weight, time: msg.data_time });
            store.missing.remove(&key);
            stats.new_values += 1;
        }
        for (x, y, z) in msg.iter_missing() {
            let key = (x, y, z);
            haves.insert(key);
            store.missing.insert(key, MissingObs { time: msg.data_time });
            store.values.remove(&key);
            self.missing_times
                .entry(key)
                .and_modify(|t| *t = (*t).max(msg.data_time))
                .or_insert(msg.data_time);
            stats.new_missing += 1;
        }

        restore_or_drop(&mut store.values, &haves, cutoff, &mut stats);
        restore_or_drop(&mut store.missing, &haves, cutoff, &mut stats);

        stats
    }

    /// Weighted-average output for one z-layer over a `num_x` x `num_y`
    /// window offset by `(offset_x, offset_y)` in the global coordinate
    /// space every source's observations are stored in.
    pub fn merge_to(
        &self,
        z: u32,
        offset_x: u32,
        offset_y: u32,
        num_x: u32,
        num_y: u32,
        cutoff: EpochSeconds,
    ) -> Vec<f32> {
        let cells = (num_x as usize) * (num_y as usize);
        let mut sum = vec![0.0f64; cells];
        let mut wsum = vec![0.0f64; cells];

        for store in self.sources.values() {
            for (&(x, y, cz), obs) in store.values.iter() {
                if cz != z || x < offset_x || y < offset_y {
                    continue;
                }
                let (lx, ly) = (x - offset_x, y - offset_y);
                if lx >= num_x || ly >= num_y {
                    continue;
                }
                let idx = (ly * num_x + lx) as usize;
                sum[idx] += obs.value as f64 * obs.weight as f64;
                wsum[idx] += obs.weight as f64;
            }
        }

        let mut out = vec![DATA_UNAVAILABLE; cells];
        for (idx, slot) in out.iter_mut().enumerate() {
            if wsum[idx] < 1e-7 {
                let x = idx as u32 % num_x + offset_x;
                let y = idx as u32 / num_x + offset_y;
                let missing_recently =
                    self.missing_times.get(&(x, y, z)).is_some_and(|&t| t >= cutoff);
                *slot = if missing_recently { MISSING_DATA } else { DATA_UNAVAILABLE };
            } else {
                *slot = (sum[idx] / wsum[idx]) as f32;
            }
        }
        out
    }

    /// Drop observations older than `now - window` across every source
    /// and prune stale missing-time entries, returning the number of
    /// observations dropped for the caller's footprint log line.
    pub fn time_purge(&mut self, now: EpochSeconds, window: EpochSeconds) -> usize {
        let cutoff = now - window;
        let mut dropped = 0;
        for store in self.sources.values_mut() {
            let before = store.values.len() + store.missing.len();
            store.values.retain(|_, o| o.time >= cutoff);
            store.missing.retain(|_, o| o.time >= cutoff);
            dropped += before - (store.values.len() + store.missing.len());
        }
        self.missing_times.retain(|_, t| *t >= cutoff);
        dropped
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn value_count(&self, source: &str) -> usize {
        self.sources.get(source).map(|s| s.values.len()).unwrap_or(0)
    }

    pub fn missing_count(&self, source: &str) -> usize {
        self.sources.get(source).map(|s| s.missing.len()).unwrap_or(0)
    }
}

/// Shared restore/drop pass used for both the value and missing stores:
/// a cell the new frame didn't touch survives only if it's not yet
/// stale relative to `cutoff`.
fn restore_or_drop<T>(
    map: &mut HashMap<CellKey, T>,
    haves: &HashSet<CellKey>,
    cutoff: EpochSeconds,
    stats: &mut MergeStats,
) where
    T: HasTime,
{
    map.retain(|key, obs| {
        if haves.contains(key) {
            return true;
        }
        let keep = obs.time() >= cutoff;
        if keep {
            stats.restored += 1;
        } else {
            stats.dropped += 1;
        }
        keep
    });
}

trait HasTime {
    fn time(&self) -> EpochSeconds;
}

impl HasTime for ValueObs {
    fn time(&self) -> EpochSeconds {
        self.time
    }
}

impl HasTime for MissingObs {
    fn time(&self) -> EpochSeconds {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_stage2::Stage2MessageBuilder;

    fn frame(radar: &str, time: EpochSeconds, cells: &[(u32, u32, u32, f32)]) -> Stage2Message {
        let mut b = Stage2MessageBuilder::new(radar, "Reflectivity", time, 0, 0, 10, 10, 1);
        for &(x, y, z, v) in cells {
            b.push_value(x, y, z, v, 1.0);
        }
        b.finish()
    }

    #[test]
    fn union_merge_restores_untouched_cells_before_cutoff() {
        let mut db = MergeDatabase::new();
        let t0 = 1_000;
        let first = frame("KTLX", t0, &[(0, 0, 0, 10.0), (1, 0, 0, 20.0), (2, 0, 0, 30.0), (3, 0, 0, 40.0), (4, 0, 0, 50.0)]);
        db.ingest(&first, t0);
        assert_eq!(db.value_count("KTLX"), 5);

        let t1 = t0 + 30;
        let second = frame("KTLX", t1, &[(0, 0, 0, 11.0), (1, 0, 0, 21.0)]);
        let stats = db.ingest(&second, t0);
        assert_eq!(stats.new_values, 2);
        assert_eq!(stats.restored, 3);
        assert_eq!(db.value_count("KTLX"), 5);
    }

    #[test]
    fn union_merge_drops_untouched_cells_past_cutoff() {
        let mut db = MergeDatabase::new();
        let t0 = 1_000;
        let first = frame("KTLX", t0, &[(0, 0, 0, 10.0), (1, 0, 0, 20.0), (2, 0, 0, 30.0), (3, 0, 0, 40.0), (4, 0, 0, 50.0)]);
        db.ingest(&first, t0);

        let t1 = t0 + 30;
        let second = frame("KTLX", t1, &[(0, 0, 0, 11.0), (1, 0, 0, 21.0)]);
        let stats = db.ingest(&second, t0 + 20);
        assert_eq!(stats.dropped, 3);
        assert_eq!(db.value_count("KTLX"), 2);
    }

    #[test]
    fn merge_to_averages_overlapping_sources() {
        let mut db = MergeDatabase::new();
        let t0 = 1_000;
        db.ingest(&frame("KTLX", t0, &[(5, 5, 0, 30.0)]), t0);
        db.ingest(&frame("KVNX", t0, &[(5, 5, 0, 50.0)]), t0);

        let out = db.merge_to(0, 0, 0, 10, 10, t0);
        assert_eq!(out[5 * 10 + 5], 40.0);
    }

    #[test]
    fn merge_to_distinguishes_missing_from_unavailable() {
        let mut db = MergeDatabase::new();
        let t0 = 1_000;
        let mut b = Stage2MessageBuilder::new("KTLX", "Reflectivity", t0, 0, 0, 10, 10, 1);
        b.push_missing(2, 2, 0);
        db.ingest(&b.finish(), t0);

        let out = db.merge_to(0, 0, 0, 10, 10, t0);
        assert_eq!(out[2 * 10 + 2], MISSING_DATA);
        assert_eq!(out[0], DATA_UNAVAILABLE);
    }

    #[test]
    fn time_purge_drops_observations_older_than_the_window() {
        let mut db = MergeDatabase::new();
        db.ingest(&frame("KTLX", 1_000, &[(0, 0, 0, 10.0)]), 1_000);
        let dropped = db.time_purge(1_400, 300);
        assert_eq!(dropped, 1);
        assert_eq!(db.value_count("KTLX"), 0);
    }
}
