//! Synthetic radar and terrain generators for property tests across the
//! fusion pipeline crates, in the spirit of the original system's
//! fake-radar-data generator: build deterministic `RadialSet`/`Dem`
//! fixtures from a fill function instead of reading live radar or
//! terrain files.

use fusion_common::geo::LLH;
use fusion_datatypes::latlon_grid::LatLonGrid;
use fusion_datatypes::radial_set::RadialSet;
use fusion_terrain::blockage::{calculate_terrain_per_gate, TerrainBlockage};
use fusion_terrain::dem::Dem;

/// Build a `RadialSet` with `num_radials` radials of `num_gates` gates
/// each, azimuths spread evenly around the full circle, every cell's
/// value supplied by `fill_fn(radial, gate)`.
pub fn make_fake_radial_set(
    radar_name: &str,
    center: LLH,
    elevation_deg: f64,
    num_radials: usize,
    num_gates: usize,
    fill_fn: impl Fn(usize, usize) -> f32,
) -> RadialSet {
    let mut rs = RadialSet::new(radar_name, center, elevation_deg, 0.0, num_radials, num_gates);
    let az_step = 360.0 / num_radials as f64;
    for radial in 0..num_radials {
        rs.set_azimuth_deg(radial, radial as f64 * az_step);
        for gate in 0..num_gates {
            rs.set_value(radial, gate, fill_fn(radial, gate));
        }
    }
    rs
}

/// Like `make_fake_radial_set`, but also runs a terrain blockage model
/// over the result, matching the two-pass "value, then block it" shape
/// of the original fake-data generator.
pub fn make_fake_radial_set_with_terrain(
    radar_name: &str,
    center: LLH,
    elevation_deg: f64,
    num_radials: usize,
    num_gates: usize,
    fill_fn: impl Fn(usize, usize) -> f32,
    model: &mut dyn TerrainBlockage,
    dem: &Dem,
) -> RadialSet {
    let mut rs = make_fake_radial_set(radar_name, center, elevation_deg, num_radials, num_gates, fill_fn);
    calculate_terrain_per_gate(model, dem, &mut rs);
    rs
}

/// Build a `Dem` covering `[nw_lat, nw_lon]` to `[se_lat, se_lon]` at
/// `spacing_deg`, every cell's height in meters from
/// `height_fn(lat_deg, lon_deg)`.
pub fn make_fake_dem(
    nw_lat_deg: f64,
    nw_lon_deg: f64,
    se_lat_deg: f64,
    se_lon_deg: f64,
    spacing_deg: f64,
    height_fn: impl Fn(f64, f64) -> f64,
) -> Dem {
    let num_lat = (((nw_lat_deg - se_lat_deg) / spacing_deg).round() as usize).max(1);
    let num_lon = (((se_lon_deg - nw_lon_deg) / spacing_deg).round() as usize).max(1);
    let mut grid = LatLonGrid::new(nw_lat_deg, nw_lon_deg, spacing_deg, spacing_deg, 0.0, num_lat, num_lon);
    for y in 0..num_lat {
        for x in 0..num_lon {
            let (lat, lon) = grid.cell_ll(y, x);
            grid.set_value(y, x, height_fn(lat, lon) as f32);
        }
    }
    Dem::new(grid)
}

/// A flat DEM at sea level, for tests that want terrain plumbing
/// present but inert.
pub fn make_flat_dem(nw_lat_deg: f64, nw_lon_deg: f64, se_lat_deg: f64, se_lon_deg: f64, spacing_deg: f64) -> Dem {
    make_fake_dem(nw_lat_deg, nw_lon_deg, se_lat_deg, se_lon_deg, spacing_deg, |_, _| 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_radial_set_has_requested_shape() {
        let rs = make_fake_radial_set(
            "KTLX",
            LLH::new(35.33, -97.27, 381.0),
            0.5,
            4,
            8,
            |_, gate| gate as f32,
        );
        assert_eq!(rs.num_radials(), 4);
        assert_eq!(rs.num_gates(), 8);
        assert_eq!(rs.value(0, 3), 3.0);
        assert_eq!(rs.azimuth_deg(2), 180.0);
    }

    #[test]
    fn fake_dem_samples_the_fill_function() {
        let dem = make_fake_dem(36.0, -98.0, 35.0, -97.0, 0.5, |lat, _lon| lat * 100.0);
        let height = dem.height_km(35.5, -97.5);
        assert!(height > 0.0);
    }

    #[test]
    fn flat_dem_is_sea_level_everywhere() {
        let dem = make_flat_dem(36.0, -98.0, 35.0, -97.0, 0.5);
        assert_eq!(dem.height_km(35.5, -97.5), 0.0);
    }
}
