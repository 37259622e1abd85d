//! The `TerrainBlockage` trait every blockage model implements, and the
//! driver that walks a `RadialSet` gate by gate applying one.

use fusion_common::geo::LLH;
use fusion_datatypes::radial_set::RadialSet;

use crate::dem::Dem;

/// Per-gate blockage result: cumulative beam blockage (CBB, the running
/// maximum along the ray out to this gate) and partial beam blockage
/// (PBB, this gate's blockage alone), plus whether the beam's bottom
/// edge has dropped into the terrain entirely.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GateBlockage {
    pub cbb: f32,
    pub pbb: f32,
    pub beam_bottom_hit: bool,
}

pub trait TerrainBlockage {
    /// Reset any running state (e.g. cumulative blockage) at the start
    /// of a new radial; blockage is a function of range along one ray.
    fn start_ray(&mut self);

    fn gate_blockage(
        &mut self,
        dem: &Dem,
        station: LLH,
        azimuth_deg: f64,
        elev_deg: f64,
        beam_width_deg: f64,
        range_km: f64,
    ) -> GateBlockage;

    fn name(&self) -> &'static str;
}

/// Run a terrain model over every gate of every radial in `radial_set`,
/// writing CBB/PBB/beam-bottom-hit into the set's terrain overlay
/// arrays (`RadialSet::ensure_terrain_arrays`/`set_terrain`).
pub fn calculate_terrain_per_gate(model: &mut dyn TerrainBlockage, dem: &Dem, radial_set: &mut RadialSet) {
    let station = radial_set.center;
    let elev_deg = radial_set.elevation_deg;
    let distance_to_first_gate_m = radial_set.distance_to_first_gate_m;
    let num_radials = radial_set.num_radials();
    let num_gates = radial_set.num_gates();

    for r in 0..num_radials {
        model.start_ray();
        let azimuth_deg = radial_set.azimuth_deg(r);
        let beam_width_deg = radial_set.beam_width_deg(r);
        let gate_width_m = radial_set.gate_width_m(r);

        for g in 0..num_gates {
            let range_km = (distance_to_first_gate_m + g as f64 * gate_width_m) / 1000.0;
            let result = model.gate_blockage(dem, station, azimuth_deg, elev_deg, beam_width_deg, range_km);
            radial_set.set_terrain(r, g, result.cbb, result.pbb, result.beam_bottom_hit);
        }
    }
}
