//! Per-radar azimuth/ground-range geometry, cached once per output-grid
//! cell and reused across every elevation tilt and every height layer a
//! resolver queries for that radar.
//!
//! Only the bearing and the geocentric-angle `sin`/`cos` pair are
//! radar-dependent-but-elevation-independent; combined with a tilt's
//! `tan(elev)`/`cos(elev)` (precomputed once per `RadialSet`, see
//! `fusion_datatypes::RadialSet::elevation_tan`/`elevation_cos`) this
//! gives the slant range to any candidate height without a second
//! trig pass per layer.

use fusion_common::geo::{Project, LLH};

use crate::sincos_cache::SinCosLatLonCache;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGeometry {
    pub azimuth_deg: f64,
    pub sin_gcd: f64,
    pub cos_gcd: f64,
}

/// Flattened `[num_lat * num_lon]` cache, one `CellGeometry` per output
/// cell, relative to a single radar.
#[derive(Debug, Clone, PartialEq)]
pub struct AzRanElevCache {
    pub radar_name: String,
    pub station: LLH,
    num_lat: usize,
    num_lon: usize,
    cells: Vec<CellGeometry>,
}

impl AzRanElevCache {
    pub fn build(radar_name: impl Into<String>, station: LLH, grid: &SinCosLatLonCache) -> Self {
        let num_lat = grid.num_lat();
        let num_lon = grid.num_lon();
        let sin_lat1 = (station.latitude_deg * DEG_TO_RAD).sin();
        let cos_lat1 = (station.latitude_deg * DEG_TO_RAD).cos();
        let lon1 = station.longitude_deg * DEG_TO_RAD;

        let mut cells = Vec::with_capacity(num_lat * num_lon);
        for y in 0..num_lat {
            let sin_lat2 = grid.sin_lat(y);
            let cos_lat2 = grid.cos_lat(y);
            for x in 0..num_lon {
                let dlon = grid.lon_deg(x) * DEG_TO_RAD - lon1;
                let (sin_dlon, cos_dlon) = (dlon.sin(), dlon.cos());

                let a = cos_lat2 * sin_dlon;
                let b = cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_dlon;
                let cos_gcd = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_dlon;
                let sin_gcd = (a * a + b * b).sqrt();
                let azimuth_deg = a.atan2(b) * RAD_TO_DEG;
                let azimuth_deg = if azimuth_deg < 0.0 {
                    azimuth_deg + 360.0
                } else {
                    azimuth_deg
                };

                cells.push(CellGeometry {
                    azimuth_deg,
                    sin_gcd,
                    cos_gcd,
                });
            }
        }

        Self {
            radar_name: radar_name.into(),
            station,
            num_lat,
            num_lon,
            cells,
        }
    }

    pub fn num_lat(&self) -> usize {
        self.num_lat
    }

    pub fn num_lon(&self) -> usize {
        self.num_lon
    }

    fn index(&self, y: usize, x: usize) -> usize {
        y * self.num_lon + x
    }

    pub fn geometry(&self, y: usize, x: usize) -> CellGeometry {
        self.cells[self.index(y, x)]
    }

    pub fn azimuth_deg(&self, y: usize, x: usize) -> f64 {
        self.geometry(y, x).azimuth_deg
    }

    /// Ground range in kilometers from the radar to cell `(y, x)`,
    /// independent of height or tilt — the great-circle distance along
    /// the cached geocentric angle.
    pub fn ground_range_km(&self, y: usize, x: usize) -> f64 {
        let g = self.geometry(y, x);
        fusion_common::geo::EARTH_RADIUS_KM * g.sin_gcd.atan2(g.cos_gcd)
    }

    /// The virtual elevation and slant range a beam would need to pass
    /// exactly through cell `(y, x)` at `target_height_km` above sea
    /// level. This is the `(virtualElevDegs, virtualRangeKMs)` pair the
    /// design's per-layer `AzRanElevCache` names; computed on demand
    /// from the height-invariant geometry cached per cell rather than
    /// stored again per layer, since the remaining math is a single
    /// inverse beam-path solve (`Project::virtual_elevation_range_km`).
    pub fn virtual_elevation_range_km(&self, y: usize, x: usize, target_height_km: f64) -> (f64, f64) {
        let ground_km = self.ground_range_km(y, x);
        Project::virtual_elevation_range_km(self.station.height_m / 1000.0, ground_km, target_height_km)
    }

    /// Slant range in kilometers from the radar to cell `(y, x)` along a
    /// tilt with precomputed `elev_tan`/`elev_cos`, landing at
    /// `target_height_km` above sea level.
    pub fn slant_range_km(
        &self,
        y: usize,
        x: usize,
        elev_tan: f64,
        elev_cos: f64,
        target_height_km: f64,
    ) -> f64 {
        let g = self.geometry(y, x);
        Project::beam_path_llh_to_attenuation_range_km(
            self.station.height_m / 1000.0,
            g.sin_gcd,
            g.cos_gcd,
            elev_tan,
            elev_cos,
            target_height_km,
        )
    }
}
