//! TileJoin: the standalone process downstream of a tiled Stage 2
//! deployment. Per-partition `LatLonGrid` outputs arrive keyed by
//! `(typeName, subtype, time)`; once every partition slot for a key is
//! filled, or the key ages out of the history window, the buffered
//! tiles are remapped by nearest-neighbor into one full-grid output.

use std::collections::HashMap;

use fusion_common::constants::is_good;
use fusion_common::coverage::LLCoverageArea;
use fusion_common::time::EpochSeconds;
use fusion_datatypes::LatLonGrid;

use crate::partition_info::PartitionInfo;

pub type TileKey = (String, String, EpochSeconds);

struct TileBuffer {
    slots: Vec<Option<LatLonGrid>>,
}

impl TileBuffer {
    fn new(num_partitions: usize) -> Self {
        Self { slots: vec![None; num_partitions] }
    }

    fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

/// Accumulates partial per-tile grids into complete full-grid frames.
pub struct TileJoin {
    area: LLCoverageArea,
    partitions: PartitionInfo,
    history_window_secs: i64,
    buffers: HashMap<TileKey, TileBuffer>,
}

impl TileJoin {
    pub fn new(area: LLCoverageArea, partitions: PartitionInfo, history_window_secs: i64) -> Self {
        Self {
            area,
            partitions,
            history_window_secs,
            buffers: HashMap::new(),
        }
    }

    /// Accept one partition's tile for `(type_name, subtype, time)`.
    /// Returns the composited full grid once every partition slot for
    /// that key has arrived. A tile whose centroid doesn't land inside
    /// the full grid is dropped (logged by the caller).
    pub fn ingest(
        &mut self,
        type_name: &str,
        subtype: &str,
        time: EpochSeconds,
        tile: LatLonGrid,
    ) -> Option<LatLonGrid> {
        let (cx, cy) = tile_centroid_cell(&tile, &self.area)?;
        let idx = self.partitions.partition_index(&self.area, cx, cy).ok()?;

        let key = (type_name.to_string(), subtype.to_string(), time);
        let num_partitions = self.partitions.num_partitions();
        let buffer = self.buffers.entry(key.clone()).or_insert_with(|| TileBuffer::new(num_partitions));
        buffer.slots[idx] = Some(tile);

        if buffer.is_full() {
            let buffer = self.buffers.remove(&key).unwrap();
            Some(composite(&self.area, buffer.slots))
        } else {
            None
        }
    }

    /// Flush every buffered key whose time has fallen outside the
    /// history window relative to `now`, compositing whatever slots
    /// arrived (an early expiration — the caller logs it).
    pub fn expire(&mut self, now: EpochSeconds) -> Vec<(TileKey, LatLonGrid)> {
        let cutoff = now - self.history_window_secs;
        let stale: Vec<TileKey> = self.buffers.keys().filter(|k| k.2 < cutoff).cloned().collect();
        stale
            .into_iter()
            .map(|key| {
                let buffer = self.buffers.remove(&key).unwrap();
                let grid = composite(&self.area, buffer.slots);
                (key, grid)
            })
            .collect()
    }

    pub fn pending_keys(&self) -> usize {
        self.buffers.len()
    }
}

fn tile_centroid_cell(tile: &LatLonGrid, area: &LLCoverageArea) -> Option<(usize, usize)> {
    let centroid_lat = tile.nw_lat_deg - (tile.num_lat() as f64 / 2.0) * tile.lat_spacing_deg;
    let centroid_lon = tile.nw_lon_deg + (tile.num_lon() as f64 / 2.0) * tile.lon_spacing_deg;
    cell_for(area, centroid_lat, centroid_lon)
}

/// Nearest-neighbor lookup of the `(x, y)` full-grid cell a lat/lon
/// point falls into, `None` if it's outside the grid.
fn cell_for(area: &LLCoverageArea, lat_deg: f64, lon_deg: f64) -> Option<(usize, usize)> {
    let row = ((area.nw_lat_deg - lat_deg) / area.lat_spacing_deg).round();
    let col = ((lon_deg - area.nw_lon_deg) / area.lon_spacing_deg).round();
    if row < 0.0 || col < 0.0 {
        return None;
    }
    let (x, y) = (col as usize, row as usize);
    if x >= area.num_x || y >= area.num_y {
        return None;
    }
    Some((x, y))
}

/// Remap every present tile's cells into the full-grid output by
/// nearest neighbor. Tiles composite in slot order, so a later tile's
/// cell wins any overlap with an earlier one at the same output cell
/// (tile partitions are expected not to overlap in practice).
fn composite(area: &LLCoverageArea, slots: Vec<Option<LatLonGrid>>) -> LatLonGrid {
    let mut out = LatLonGrid::new(
        area.nw_lat_deg,
        area.nw_lon_deg,
        area.lat_spacing_deg,
        area.lon_spacing_deg,
        area.heights_km.first().copied().unwrap_or(0.0),
        area.num_y,
        area.num_x,
    );

    for tile in slots.into_iter().flatten() {
        for y in 0..tile.num_lat() {
            for x in 0..tile.num_lon() {
                let v = tile.value(y, x);
                if !is_good(v) {
                    continue;
                }
                let (lat, lon) = tile.cell_ll(y, x);
                if let Some((gx, gy)) = cell_for(area, lat, lon) {
                    out.set_value(gy, gx, v);
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_area() -> LLCoverageArea {
        let mut a = LLCoverageArea::default();
        a.set(40.0, -100.0, 38.0, -98.0, 0.1, 0.1, 20, 20);
        a
    }

    fn tile_for(area: &LLCoverageArea, tiles: &PartitionInfo, col: usize, row: usize, value: f32) -> LatLonGrid {
        let areas = tiles.tile_areas(area).unwrap();
        let tile_area = &areas[row * 2 + col];
        let mut g = LatLonGrid::new(
            tile_area.nw_lat_deg,
            tile_area.nw_lon_deg,
            tile_area.lat_spacing_deg,
            tile_area.lon_spacing_deg,
            0.0,
            tile_area.num_y,
            tile_area.num_x,
        );
        for v in g.values_mut() {
            *v = value;
        }
        g
    }

    #[test]
    fn composites_once_every_partition_slot_arrives() {
        let area = full_area();
        let partitions = PartitionInfo::Tile { tiles_x: 2, tiles_y: 2 };
        let mut join = TileJoin::new(area.clone(), partitions, 300);

        let a = tile_for(&area, &partitions, 0, 0, 10.0);
        let b = tile_for(&area, &partitions, 1, 0, 20.0);
        let c = tile_for(&area, &partitions, 0, 1, 30.0);
        let d = tile_for(&area, &partitions, 1, 1, 40.0);

        assert!(join.ingest("Reflectivity", "", 1000, a).is_none());
        assert!(join.ingest("Reflectivity", "", 1000, b).is_none());
        assert!(join.ingest("Reflectivity", "", 1000, c).is_none());
        let merged = join.ingest("Reflectivity", "", 1000, d).unwrap();

        assert_eq!(merged.num_lat(), area.num_y);
        assert_eq!(merged.num_lon(), area.num_x);
        assert_eq!(join.pending_keys(), 0);
    }

    #[test]
    fn stale_keys_expire_early_with_whatever_arrived() {
        let area = full_area();
        let partitions = PartitionInfo::Tile { tiles_x: 2, tiles_y: 2 };
        let mut join = TileJoin::new(area.clone(), partitions, 300);

        let a = tile_for(&area, &partitions, 0, 0, 10.0);
        assert!(join.ingest("Reflectivity", "", 1000, a).is_none());
        assert_eq!(join.pending_keys(), 1);

        let expired = join.expire(1000 + 301);
        assert_eq!(expired.len(), 1);
        assert_eq!(join.pending_keys(), 0);
    }
}
