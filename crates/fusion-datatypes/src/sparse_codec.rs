//! MRMS-style sparse grid encoding: a grid is mostly `DATA_UNAVAILABLE`
//! outside radar coverage, so rather than transport the dense array we
//! walk each row and emit a run per maximal stretch of equal, "good"
//! values — `(x, y, z, count, value)` — skipping missing cells entirely.
//! This is the wire format Stage 1 hands to Stage 2 and the format
//! `LatLonGrid`/`LLHGridN2D` serialize through.

use crate::latlon_grid::LatLonGrid;
use fusion_common::constants::is_good;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRun {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub count: u32,
    pub value: f32,
}

pub struct SparseGridCodec;

impl SparseGridCodec {
    /// Encode one layer of a grid at height-index `z` into pixel runs.
    /// Only "good" values are emitted; a new run starts whenever the
    /// value changes, a row ends, or a missing cell is crossed.
    pub fn encode_layer(grid: &LatLonGrid, z: u32) -> Vec<PixelRun> {
        let mut runs = Vec::new();
        let num_lon = grid.num_lon();

        for y in 0..grid.num_lat() {
            let mut run_start: Option<(usize, f32)> = None;

            let mut flush = |runs: &mut Vec<PixelRun>, start: usize, end: usize, value: f32| {
                if end > start {
                    runs.push(PixelRun {
                        x: start as u32,
                        y: y as u32,
                        z,
                        count: (end - start) as u32,
                        value,
                    });
                }
            };

            for x in 0..num_lon {
                let v = grid.value(y, x);
                match run_start {
                    Some((start, cur)) if is_good(v) && v == cur => {
                        run_start = Some((start, cur));
                        let _ = x;
                    }
                    _ => {
                        if let Some((start, cur)) = run_start.take() {
                            flush(&mut runs, start, x, cur);
                        }
                        if is_good(v) {
                            run_start = Some((x, v));
                        }
                    }
                }
            }
            if let Some((start, cur)) = run_start.take() {
                flush(&mut runs, start, num_lon, cur);
            }
        }

        runs
    }

    /// Apply decoded runs back onto a grid layer, leaving untouched cells
    /// at their existing (typically `DATA_UNAVAILABLE`) value.
    pub fn decode_into(grid: &mut LatLonGrid, runs: &[PixelRun], z: u32) {
        for run in runs {
            if run.z != z {
                continue;
            }
            for i in 0..run.count {
                grid.set_value(run.y as usize, (run.x + i) as usize, run.value);
            }
        }
    }

    /// Total number of individual cells represented by a run list, for
    /// logging compression ratios.
    pub fn pixel_count(runs: &[PixelRun]) -> u64 {
        runs.iter().map(|r| r.count as u64).sum()
    }
}
