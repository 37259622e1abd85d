//! Digital elevation model lookups backing terrain blockage.

use fusion_datatypes::latlon_grid::LatLonGrid;

/// A dense terrain-height grid in meters above sea level, indexed the
/// same way a `LatLonGrid` output layer is (north-west corner, fixed
/// row/column spacing).
#[derive(Debug, Clone, PartialEq)]
pub struct Dem {
    grid: LatLonGrid,
}

impl Dem {
    pub fn new(grid: LatLonGrid) -> Self {
        Self { grid }
    }

    /// Nearest-neighbor terrain height in kilometers at `(lat, lon)`.
    /// Cells outside the DEM's coverage, or carrying no data, default
    /// to sea level (0.0) rather than failing the blockage calculation.
    pub fn height_km(&self, lat_deg: f64, lon_deg: f64) -> f64 {
        let row = ((self.grid.nw_lat_deg - lat_deg) / self.grid.lat_spacing_deg).round();
        let col = ((lon_deg - self.grid.nw_lon_deg) / self.grid.lon_spacing_deg).round();

        if row < 0.0 || col < 0.0 {
            return 0.0;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.grid.num_lat() || col >= self.grid.num_lon() {
            return 0.0;
        }

        let height_m = self.grid.value(row, col);
        if !fusion_common::constants::is_good(height_m) {
            0.0
        } else {
            height_m as f64 / 1000.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cells_default_to_sea_level() {
        let grid = LatLonGrid::new(40.0, -100.0, 0.1, 0.1, 0.0, 5, 5);
        let dem = Dem::new(grid);
        assert_eq!(dem.height_km(39.9, -99.9), 0.0);
    }

    #[test]
    fn out_of_bounds_defaults_to_sea_level() {
        let grid = LatLonGrid::new(40.0, -100.0, 0.1, 0.1, 0.0, 5, 5);
        let dem = Dem::new(grid);
        assert_eq!(dem.height_km(50.0, -100.0), 0.0);
    }

    #[test]
    fn present_cell_converts_meters_to_km() {
        let mut grid = LatLonGrid::new(40.0, -100.0, 0.1, 0.1, 0.0, 5, 5);
        grid.set_value(2, 2, 1500.0);
        let dem = Dem::new(grid);
        let lat = 40.0 - 2.0 * 0.1;
        let lon = -100.0 + 2.0 * 0.1;
        assert!((dem.height_km(lat, lon) - 1.5).abs() < 1e-9);
    }
}
