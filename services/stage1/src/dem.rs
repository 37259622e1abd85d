//! Loading a terrain DEM off disk.
//!
//! GRIB2/NetCDF/raster DEM readers are out of scope (an external
//! collaborator's job per SPEC_FULL.md §1: "a terrain DEM readable as a
//! LatLonGrid" is handed to this process, not parsed by it). What this
//! module actually reads is a small JSON dump of that same
//! `LatLonGrid` shape, which is what a real DEM reader would hand back
//! after doing the format-specific work.

use std::fs::File;
use std::io::BufReader;

use fusion_common::error::{io_error, FusionError, FusionResult};
use fusion_datatypes::latlon_grid::LatLonGrid;
use fusion_terrain::Dem;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct DemFile {
    nw_lat_deg: f64,
    nw_lon_deg: f64,
    lat_spacing_deg: f64,
    lon_spacing_deg: f64,
    num_lat: usize,
    num_lon: usize,
    /// Row-major, `num_lat * num_lon` terrain heights in meters above
    /// sea level.
    heights_m: Vec<f32>,
}

/// Load a DEM from `path`. Per SPEC_FULL.md §4.4, the absence of a
/// `--terrain` flag means no terrain correction runs at all; this
/// function is only ever called once `--terrain` is set, at which
/// point an unreadable or malformed DEM is a fatal startup error
/// rather than a silent fallback to "no terrain".
pub fn load_dem(path: &str) -> FusionResult<Dem> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let dem_file: DemFile = serde_json::from_reader(BufReader::new(file))?;

    if dem_file.heights_m.len() != dem_file.num_lat * dem_file.num_lon {
        return Err(FusionError::CorruptArtifact(format!(
            "DEM '{path}': expected {} heights for a {}x{} grid, got {}",
            dem_file.num_lat * dem_file.num_lon,
            dem_file.num_lat,
            dem_file.num_lon,
            dem_file.heights_m.len()
        )));
    }

    let mut grid = LatLonGrid::new(
        dem_file.nw_lat_deg,
        dem_file.nw_lon_deg,
        dem_file.lat_spacing_deg,
        dem_file.lon_spacing_deg,
        0.0,
        dem_file.num_lat,
        dem_file.num_lon,
    );
    for y in 0..dem_file.num_lat {
        for x in 0..dem_file.num_lon {
            grid.set_value(y, x, dem_file.heights_m[y * dem_file.num_lon + x]);
        }
    }

    Ok(Dem::new(grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_a_mismatched_height_count() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmp,
            r#"{{"nw_lat_deg":40.0,"nw_lon_deg":-100.0,"lat_spacing_deg":0.1,"lon_spacing_deg":0.1,"num_lat":2,"num_lon":2,"heights_m":[1.0]}}"#
        )
        .unwrap();
        let err = load_dem(tmp.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, FusionError::CorruptArtifact(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_dem("/nonexistent/path/to/a.dem").unwrap_err();
        assert!(matches!(err, FusionError::Io { .. }));
    }

    #[test]
    fn loads_a_well_formed_dem() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmp,
            r#"{{"nw_lat_deg":40.0,"nw_lon_deg":-100.0,"lat_spacing_deg":0.1,"lon_spacing_deg":0.1,"num_lat":2,"num_lon":2,"heights_m":[100.0,200.0,300.0,400.0]}}"#
        )
        .unwrap();
        let dem = load_dem(tmp.path().to_str().unwrap()).unwrap();
        assert!((dem.height_km(40.0, -100.0) - 0.1).abs() < 1e-9);
        assert!((dem.height_km(39.9, -99.9) - 0.4).abs() < 1e-9);
    }
}
