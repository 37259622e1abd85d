//! Per-row/per-column `sin`/`cos` of an output grid's lat/lon axes.
//!
//! The grid's lat/lon axes are independent (row `y` fixes latitude,
//! column `x` fixes longitude), so there are only `num_lat + num_lon`
//! distinct trig results in a grid of `num_lat * num_lon` cells. Built
//! once per coverage area and reused across every radar and every tilt
//! that touches it.

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SinCosLatLonCache {
    lat_deg: Vec<f64>,
    lon_deg: Vec<f64>,
    sin_lat: Vec<f64>,
    cos_lat: Vec<f64>,
    sin_lon: Vec<f64>,
    cos_lon: Vec<f64>,
}

impl SinCosLatLonCache {
    pub fn new(
        nw_lat_deg: f64,
        nw_lon_deg: f64,
        lat_spacing_deg: f64,
        lon_spacing_deg: f64,
        num_lat: usize,
        num_lon: usize,
    ) -> Self {
        let lat_deg: Vec<f64> = (0..num_lat)
            .map(|y| nw_lat_deg - y as f64 * lat_spacing_deg)
            .collect();
        let lon_deg: Vec<f64> = (0..num_lon)
            .map(|x| nw_lon_deg + x as f64 * lon_spacing_deg)
            .collect();

        let sin_lat = lat_deg.iter().map(|d| (d * DEG_TO_RAD).sin()).collect();
        let cos_lat = lat_deg.iter().map(|d| (d * DEG_TO_RAD).cos()).collect();
        let sin_lon = lon_deg.iter().map(|d| (d * DEG_TO_RAD).sin()).collect();
        let cos_lon = lon_deg.iter().map(|d| (d * DEG_TO_RAD).cos()).collect();

        Self {
            lat_deg,
            lon_deg,
            sin_lat,
            cos_lat,
            sin_lon,
            cos_lon,
        }
    }

    pub fn num_lat(&self) -> usize {
        self.lat_deg.len()
    }

    pub fn num_lon(&self) -> usize {
        self.lon_deg.len()
    }

    pub fn lat_deg(&self, y: usize) -> f64 {
        self.lat_deg[y]
    }

    pub fn lon_deg(&self, x: usize) -> f64 {
        self.lon_deg[x]
    }

    pub fn sin_lat(&self, y: usize) -> f64 {
        self.sin_lat[y]
    }

    pub fn cos_lat(&self, y: usize) -> f64 {
        self.cos_lat[y]
    }

    pub fn sin_lon(&self, x: usize) -> f64 {
        self.sin_lon[x]
    }

    pub fn cos_lon(&self, x: usize) -> f64 {
        self.cos_lon[x]
    }
}
