//! 3D virtual-volume grids: `LatLonHeightGrid` is a dense cube used for
//! small test and diagnostic volumes, `LLHGridN2D` is the lazily
//! materialized stack of `LatLonGrid` layers Stage 2 actually ingests
//! and merges — heights are integer meters so layer identity is an
//! exact key, not a float comparison.

use crate::grid::{ArrayStorage, DataGrid};
use crate::latlon_grid::LatLonGrid;

#[derive(Debug, Clone, PartialEq)]
pub struct LatLonHeightGrid {
    grid: DataGrid,
    lat_dim: usize,
    lon_dim: usize,
    height_dim: usize,
    pub nw_lat_deg: f64,
    pub nw_lon_deg: f64,
    pub lat_spacing_deg: f64,
    pub lon_spacing_deg: f64,
    pub heights_m: Vec<i32>,
}

impl LatLonHeightGrid {
    pub fn new(
        nw_lat_deg: f64,
        nw_lon_deg: f64,
        lat_spacing_deg: f64,
        lon_spacing_deg: f64,
        heights_m: Vec<i32>,
        num_lat: usize,
        num_lon: usize,
    ) -> Self {
        let mut grid = DataGrid::new();
        let lat_dim = grid.add_dimension("Lat", num_lat);
        let lon_dim = grid.add_dimension("Lon", num_lon);
        let height_dim = grid.add_dimension("Height", heights_m.len());
        let n = num_lat * num_lon * heights_m.len();
        grid.add_array(
            "value",
            vec![height_dim, lat_dim, lon_dim],
            ArrayStorage::Float(vec![fusion_common::constants::DATA_UNAVAILABLE; n]),
        );

        Self {
            grid,
            lat_dim,
            lon_dim,
            height_dim,
            nw_lat_deg,
            nw_lon_deg,
            lat_spacing_deg,
            lon_spacing_deg,
            heights_m,
        }
    }

    pub fn num_lat(&self) -> usize {
        self.grid.dim_size(self.lat_dim)
    }

    pub fn num_lon(&self) -> usize {
        self.grid.dim_size(self.lon_dim)
    }

    pub fn num_z(&self) -> usize {
        self.grid.dim_size(self.height_dim)
    }

    fn index(&self, z: usize, y: usize, x: usize) -> usize {
        (z * self.num_lat() + y) * self.num_lon() + x
    }

    pub fn value(&self, z: usize, y: usize, x: usize) -> f32 {
        let i = self.index(z, y, x);
        self.grid.float_array("value").unwrap()[i]
    }

    pub fn set_value(&mut self, z: usize, y: usize, x: usize, v: f32) {
        let i = self.index(z, y, x);
        self.grid.float_array_mut("value").unwrap()[i] = v;
    }
}

/// A 3D virtual volume stored as a sparse stack of 2D layers, keyed by
/// integer-meter height. Layers are only allocated once a cell at that
/// height is actually written, which is the common case for a CONUS-scale
/// grid where most (x, y, z) cells see no radar coverage at all.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LLHGridN2D {
    nw_lat_deg: f64,
    nw_lon_deg: f64,
    lat_spacing_deg: f64,
    lon_spacing_deg: f64,
    num_lat: usize,
    num_lon: usize,
    layers: Vec<(i32, LatLonGrid)>,
}

impl LLHGridN2D {
    pub fn new(
        nw_lat_deg: f64,
        nw_lon_deg: f64,
        lat_spacing_deg: f64,
        lon_spacing_deg: f64,
        num_lat: usize,
        num_lon: usize,
    ) -> Self {
        Self {
            nw_lat_deg,
            nw_lon_deg,
            lat_spacing_deg,
            lon_spacing_deg,
            num_lat,
            num_lon,
            layers: Vec::new(),
        }
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layer_heights_m(&self) -> impl Iterator<Item = i32> + '_ {
        self.layers.iter().map(|(h, _)| *h)
    }

    /// Look up an already-materialized layer. Returns `None` if no cell
    /// at this height has been written yet.
    pub fn get_layer(&self, height_m: i32) -> Option<&LatLonGrid> {
        self.layers
            .iter()
            .find(|(h, _)| *h == height_m)
            .map(|(_, g)| g)
    }

    pub fn get_layer_mut(&mut self, height_m: i32) -> Option<&mut LatLonGrid> {
        self.layers
            .iter_mut()
            .find(|(h, _)| *h == height_m)
            .map(|(_, g)| g)
    }

    /// Fetch the layer at `height_m`, allocating a fresh one (filled with
    /// `DATA_UNAVAILABLE`) if this is the first write at that height.
    /// Always returns the stored layer, never `None` after allocation.
    pub fn get_or_create_layer(&mut self, height_m: i32) -> &mut LatLonGrid {
        if let Some(pos) = self.layers.iter().position(|(h, _)| *h == height_m) {
            return &mut self.layers[pos].1;
        }
        let grid = LatLonGrid::new(
            self.nw_lat_deg,
            self.nw_lon_deg,
            self.lat_spacing_deg,
            self.lon_spacing_deg,
            height_m as f64,
            self.num_lat,
            self.num_lon,
        );
        self.layers.push((height_m, grid));
        &mut self.layers.last_mut().unwrap().1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_materialize_lazily() {
        let mut v = LLHGridN2D::new(40.0, -100.0, 0.01, 0.01, 10, 10);
        assert_eq!(v.num_layers(), 0);
        assert!(v.get_layer(500).is_none());

        v.get_or_create_layer(500).set_value(1, 1, 42.0);
        assert_eq!(v.num_layers(), 1);
        assert_eq!(v.get_layer(500).unwrap().value(1, 1), 42.0);
    }

    #[test]
    fn get_or_create_is_idempotent_per_height() {
        let mut v = LLHGridN2D::new(40.0, -100.0, 0.01, 0.01, 5, 5);
        v.get_or_create_layer(1000).set_value(0, 0, 1.0);
        v.get_or_create_layer(1000).set_value(0, 1, 2.0);
        assert_eq!(v.num_layers(), 1);
        let layer = v.get_layer(1000).unwrap();
        assert_eq!(layer.value(0, 0), 1.0);
        assert_eq!(layer.value(0, 1), 2.0);
    }

    #[test]
    fn dense_cube_indexes_in_zyx_order() {
        let mut cube = LatLonHeightGrid::new(40.0, -100.0, 0.01, 0.01, vec![500, 1000], 3, 3);
        cube.set_value(1, 2, 0, 7.0);
        assert_eq!(cube.value(1, 2, 0), 7.0);
        assert_eq!(cube.value(0, 2, 0), fusion_common::constants::DATA_UNAVAILABLE);
    }
}
