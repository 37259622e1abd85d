//! Single-ray terrain blockage: checks only the beam's center height
//! against the local terrain, rather than integrating over a
//! half-power disk. Cheaper than `Bech2me` and used as a fast
//! diagnostic alternative, not the default model.

use fusion_common::geo::{Project, LLH};

use crate::blockage::{GateBlockage, TerrainBlockage};
use crate::dem::Dem;

pub struct LakRayPencil {
    running_cbb: f32,
}

impl LakRayPencil {
    pub fn new() -> Self {
        Self { running_cbb: 0.0 }
    }
}

impl Default for LakRayPencil {
    fn default() -> Self {
        Self::new()
    }
}

impl TerrainBlockage for LakRayPencil {
    fn start_ray(&mut self) {
        self.running_cbb = 0.0;
    }

    fn gate_blockage(
        &mut self,
        dem: &Dem,
        station: LLH,
        azimuth_deg: f64,
        elev_deg: f64,
        _beam_width_deg: f64,
        range_km: f64,
    ) -> GateBlockage {
        let station_height_km = station.height_m / 1000.0;
        let center = Project::beam_path_az_ran_elev_to_llh(
            station.latitude_deg,
            station.longitude_deg,
            station_height_km,
            azimuth_deg,
            elev_deg,
            range_km,
        );
        let center_height_km = center.height_m / 1000.0;
        let terrain_km = dem.height_km(center.latitude_deg, center.longitude_deg);

        let blocked = terrain_km >= center_height_km;
        let pbb = if blocked { 1.0 } else { 0.0 };
        let cbb = self.running_cbb.max(pbb);
        self.running_cbb = cbb;

        GateBlockage {
            cbb,
            pbb,
            beam_bottom_hit: blocked,
        }
    }

    fn name(&self) -> &'static str {
        "lak"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_datatypes::latlon_grid::LatLonGrid;

    #[test]
    fn mountain_in_the_beam_path_blocks_the_gate() {
        let station = LLH::new(35.33, -97.27, 0.417);
        let mut dem_grid = LatLonGrid::new(36.0, -98.0, 0.01, 0.01, 0.0, 200, 200);
        for y in 0..200 {
            for x in 0..200 {
                dem_grid.set_value(y, x, 5000.0);
            }
        }
        let dem = Dem::new(dem_grid);
        let mut model = LakRayPencil::new();
        model.start_ray();
        let result = model.gate_blockage(&dem, station, 0.0, 0.5, 1.0, 80.0);
        assert!(result.beam_bottom_hit);
        assert_eq!(result.pbb, 1.0);
    }
}
