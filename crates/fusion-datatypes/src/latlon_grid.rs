//! `LatLonGrid`: a single dense 2D lat/lon layer at a fixed height, the
//! per-layer building block `LLHGridN2D` stacks to form a 3D virtual
//! volume, and the output format Stage 2 produces before a layer is
//! handed to the sparse codec for transport.

use crate::attributes::keys;
use crate::grid::{ArrayStorage, DataGrid};

#[derive(Debug, Clone, PartialEq)]
pub struct LatLonGrid {
    grid: DataGrid,
    lat_dim: usize,
    lon_dim: usize,
    pub nw_lat_deg: f64,
    pub nw_lon_deg: f64,
    pub lat_spacing_deg: f64,
    pub lon_spacing_deg: f64,
    pub height_m: f64,
}

impl LatLonGrid {
    pub fn new(
        nw_lat_deg: f64,
        nw_lon_deg: f64,
        lat_spacing_deg: f64,
        lon_spacing_deg: f64,
        height_m: f64,
        num_lat: usize,
        num_lon: usize,
    ) -> Self {
        let mut grid = DataGrid::new();
        let lat_dim = grid.add_dimension("Lat", num_lat);
        let lon_dim = grid.add_dimension("Lon", num_lon);
        grid.add_array(
            "value",
            vec![lat_dim, lon_dim],
            ArrayStorage::Float(vec![
                fusion_common::constants::DATA_UNAVAILABLE;
                num_lat * num_lon
            ]),
        );
        grid.attributes.set_f64(keys::LATITUDE, nw_lat_deg);
        grid.attributes.set_f64(keys::LONGITUDE, nw_lon_deg);
        grid.attributes.set_f64(keys::HEIGHT, height_m);

        Self {
            grid,
            lat_dim,
            lon_dim,
            nw_lat_deg,
            nw_lon_deg,
            lat_spacing_deg,
            lon_spacing_deg,
            height_m,
        }
    }

    pub fn num_lat(&self) -> usize {
        self.grid.dim_size(self.lat_dim)
    }

    pub fn num_lon(&self) -> usize {
        self.grid.dim_size(self.lon_dim)
    }

    pub fn grid(&self) -> &DataGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut DataGrid {
        &mut self.grid
    }

    fn index(&self, y: usize, x: usize) -> usize {
        y * self.num_lon() + x
    }

    pub fn value(&self, y: usize, x: usize) -> f32 {
        let i = self.index(y, x);
        self.grid.float_array("value").unwrap()[i]
    }

    pub fn set_value(&mut self, y: usize, x: usize, v: f32) {
        let i = self.index(y, x);
        self.grid.float_array_mut("value").unwrap()[i] = v;
    }

    pub fn values(&self) -> &[f32] {
        self.grid.float_array("value").unwrap()
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        self.grid.float_array_mut("value").unwrap()
    }

    /// Lat/lon of cell `(y, x)`, matching the north-west-corner convention
    /// (row 0 is the northernmost row, column 0 the westernmost column).
    pub fn cell_ll(&self, y: usize, x: usize) -> (f64, f64) {
        (
            self.nw_lat_deg - y as f64 * self.lat_spacing_deg,
            self.nw_lon_deg + x as f64 * self.lon_spacing_deg,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_ll_walks_south_and_east_from_nw_corner() {
        let g = LatLonGrid::new(40.0, -100.0, 0.01, 0.01, 500.0, 10, 10);
        let (lat0, lon0) = g.cell_ll(0, 0);
        assert_eq!((lat0, lon0), (40.0, -100.0));
        let (lat1, lon1) = g.cell_ll(1, 1);
        assert!((lat1 - 39.99).abs() < 1e-9);
        assert!((lon1 - -99.99).abs() < 1e-9);
    }

    #[test]
    fn value_round_trips() {
        let mut g = LatLonGrid::new(40.0, -100.0, 0.01, 0.01, 500.0, 4, 4);
        g.set_value(2, 3, 42.5);
        assert_eq!(g.value(2, 3), 42.5);
        assert_eq!(g.value(0, 0), fusion_common::constants::DATA_UNAVAILABLE);
    }
}
