//! Half-power disk terrain blockage (Bech et al. 2003), the "2me"
//! model: approximates the beam's cross-section at a gate as a disk of
//! radius `a`, derives what fraction of that disk's area sits below
//! the local terrain height, and tracks the running maximum along the
//! ray as cumulative beam blockage.

use fusion_common::geo::{Project, LLH};

use crate::blockage::{GateBlockage, TerrainBlockage};
use crate::dem::Dem;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

pub struct Bech2me {
    /// Minimum terrain clearance, in kilometers, below which a gate's
    /// beam bottom is considered to have hit the ground.
    min_terrain_km: f64,
    running_cbb: f32,
}

impl Bech2me {
    pub fn new(min_terrain_km: f64) -> Self {
        Self {
            min_terrain_km,
            running_cbb: 0.0,
        }
    }
}

impl TerrainBlockage for Bech2me {
    fn start_ray(&mut self) {
        self.running_cbb = 0.0;
    }

    fn gate_blockage(
        &mut self,
        dem: &Dem,
        station: LLH,
        azimuth_deg: f64,
        elev_deg: f64,
        beam_width_deg: f64,
        range_km: f64,
    ) -> GateBlockage {
        let station_height_km = station.height_m / 1000.0;
        let bottom_deg = elev_deg - 0.5 * beam_width_deg;

        let center_height_km = Project::attenuation_height_km(station_height_km, range_km, elev_deg);
        let bottom_point =
            Project::beam_path_az_ran_elev_to_llh(station.latitude_deg, station.longitude_deg, station_height_km, azimuth_deg, bottom_deg, range_km);
        let bottom_height_km = bottom_point.height_m / 1000.0;

        let terrain_km = dem.height_km(bottom_point.latitude_deg, bottom_point.longitude_deg);

        let a = (range_km * beam_width_deg * DEG_TO_RAD) / 2.0;
        let y = terrain_km - center_height_km;

        let pbb = if a <= 0.0 {
            0.0
        } else if y >= a {
            1.0
        } else if y <= -a {
            0.0
        } else {
            let num = y * (a * a - y * y).sqrt() + a * a * (y / a).asin() + std::f64::consts::PI * a * a / 2.0;
            let area = std::f64::consts::PI * a * a;
            (num / area).clamp(0.0, 1.0)
        };

        let cbb = self.running_cbb.max(pbb as f32);
        self.running_cbb = cbb;

        let hit = bottom_height_km - terrain_km <= self.min_terrain_km;

        GateBlockage {
            cbb,
            pbb: pbb as f32,
            beam_bottom_hit: hit,
        }
    }

    fn name(&self) -> &'static str {
        "bech2me"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_terrain_far_below_beam_is_unblocked() {
        let station = LLH::new(35.33, -97.27, 0.417);
        let dem_grid = fusion_datatypes::latlon_grid::LatLonGrid::new(36.0, -98.0, 0.05, 0.05, 0.0, 40, 40);
        let dem = Dem::new(dem_grid);
        let mut model = Bech2me::new(0.05);
        model.start_ray();
        let result = model.gate_blockage(&dem, station, 0.0, 2.0, 1.0, 50.0);
        assert_eq!(result.pbb, 0.0);
        assert_eq!(result.cbb, 0.0);
    }

    #[test]
    fn cbb_is_monotonic_along_a_ray() {
        let station = LLH::new(35.33, -97.27, 0.417);
        let mut dem_grid = fusion_datatypes::latlon_grid::LatLonGrid::new(36.0, -98.0, 0.01, 0.01, 0.0, 200, 200);
        for y in 0..200 {
            for x in 0..200 {
                dem_grid.set_value(y, x, 3000.0);
            }
        }
        let dem = Dem::new(dem_grid);
        let mut model = Bech2me::new(0.05);
        model.start_ray();
        let near = model.gate_blockage(&dem, station, 0.0, 0.5, 1.0, 5.0);
        let far = model.gate_blockage(&dem, station, 0.0, 0.5, 1.0, 80.0);
        assert!(far.cbb >= near.cbb);
    }
}
