//! `RadialSet`: a single polar radar tilt. Dims are `{Azimuth, Gate}`;
//! `value[radial][gate]` is the primary 2D array, with per-radial
//! `Azimuth`/`BeamWidth`/`GateWidth`/`AzimuthSpacing` 1D arrays and, once
//! the terrain blockage pass has run, optional per-gate CBB/PBB/
//! beam-bottom-hit overlays.

use crate::attributes::keys;
use crate::grid::{ArrayStorage, DataGrid};
use fusion_common::geo::LLH;

/// A `RadialSet`'s rolling identity, used by the projection cache's
/// enclosing-tilt-identity check (`LevelSameCache`). `0` is reserved to
/// mean "no tilt"; the allocator skips it on wraparound.
pub type RadialSetId = u8;

#[derive(Debug, Clone, PartialEq)]
pub struct RadialSet {
    grid: DataGrid,
    azimuth_dim: usize,
    gate_dim: usize,
    pub id: RadialSetId,
    pub radar_name: String,
    pub center: LLH,
    pub elevation_deg: f64,
    pub distance_to_first_gate_m: f64,
}

impl RadialSet {
    pub fn new(
        radar_name: impl Into<String>,
        center: LLH,
        elevation_deg: f64,
        distance_to_first_gate_m: f64,
        num_radials: usize,
        num_gates: usize,
    ) -> Self {
        let mut grid = DataGrid::new();
        let az_dim = grid.add_dimension("Azimuth", num_radials);
        let gate_dim = grid.add_dimension("Gate", num_gates);

        grid.add_array(
            "Azimuth",
            vec![az_dim],
            ArrayStorage::Float(vec![0.0; num_radials]),
        );
        grid.add_array(
            "BeamWidth",
            vec![az_dim],
            ArrayStorage::Float(vec![1.0; num_radials]),
        );
        grid.add_array(
            "GateWidth",
            vec![az_dim],
            ArrayStorage::Float(vec![250.0; num_radials]),
        );
        grid.add_array(
            "AzimuthSpacing",
            vec![az_dim],
            ArrayStorage::Float(vec![1.0; num_radials]),
        );
        grid.add_array(
            "value",
            vec![az_dim, gate_dim],
            ArrayStorage::Float(vec![
                fusion_common::constants::DATA_UNAVAILABLE;
                num_radials * num_gates
            ]),
        );

        grid.attributes.set_str(keys::TYPE_NAME, "Reflectivity");
        grid.attributes.set_f64(keys::LATITUDE, center.latitude_deg);
        grid.attributes.set_f64(keys::LONGITUDE, center.longitude_deg);
        grid.attributes.set_f64(keys::HEIGHT, center.height_m);

        Self {
            grid,
            azimuth_dim: az_dim,
            gate_dim,
            id: 0,
            radar_name: radar_name.into(),
            center,
            elevation_deg,
            distance_to_first_gate_m,
        }
    }

    pub fn num_radials(&self) -> usize {
        self.grid.dim_size(self.azimuth_dim)
    }

    pub fn num_gates(&self) -> usize {
        self.grid.dim_size(self.gate_dim)
    }

    pub fn grid(&self) -> &DataGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut DataGrid {
        &mut self.grid
    }

    /// `tan(elevation)`, precomputed per the data model so the beam-path
    /// projection cache never repeats the trig call per cell.
    pub fn elevation_tan(&self) -> f64 {
        self.elevation_deg.to_radians().tan()
    }

    pub fn elevation_cos(&self) -> f64 {
        self.elevation_deg.to_radians().cos()
    }

    fn index(&self, radial: usize, gate: usize) -> usize {
        radial * self.num_gates() + gate
    }

    pub fn azimuth_deg(&self, radial: usize) -> f64 {
        self.grid.float_array("Azimuth").unwrap()[radial] as f64
    }

    pub fn set_azimuth_deg(&mut self, radial: usize, v: f64) {
        self.grid.float_array_mut("Azimuth").unwrap()[radial] = v as f32;
    }

    pub fn beam_width_deg(&self, radial: usize) -> f64 {
        self.grid.float_array("BeamWidth").unwrap()[radial] as f64
    }

    pub fn set_beam_width_deg(&mut self, radial: usize, v: f64) {
        self.grid.float_array_mut("BeamWidth").unwrap()[radial] = v as f32;
    }

    pub fn gate_width_m(&self, radial: usize) -> f64 {
        self.grid.float_array("GateWidth").unwrap()[radial] as f64
    }

    pub fn value(&self, radial: usize, gate: usize) -> f32 {
        let i = self.index(radial, gate);
        self.grid.float_array("value").unwrap()[i]
    }

    pub fn set_value(&mut self, radial: usize, gate: usize, v: f32) {
        let i = self.index(radial, gate);
        self.grid.float_array_mut("value").unwrap()[i] = v;
    }

    /// Attach zeroed terrain overlay arrays; called once by the terrain
    /// blockage pass before it fills them in per-gate.
    pub fn ensure_terrain_arrays(&mut self) {
        if self.grid.array("TerrainCBBPercent").is_some() {
            return;
        }
        let n = self.num_radials() * self.num_gates();
        let (az, gate) = (self.azimuth_dim, self.gate_dim);
        self.grid
            .add_array("TerrainCBBPercent", vec![az, gate], ArrayStorage::Float(vec![0.0; n]));
        self.grid
            .add_array("TerrainPBBPercent", vec![az, gate], ArrayStorage::Float(vec![0.0; n]));
        self.grid
            .add_array("TerrainBeamBottomHit", vec![az, gate], ArrayStorage::Byte(vec![0; n]));
    }

    pub fn has_terrain(&self) -> bool {
        self.grid.array("TerrainCBBPercent").is_some()
    }

    pub fn terrain_cbb(&self, radial: usize, gate: usize) -> f32 {
        if !self.has_terrain() {
            return 0.0;
        }
        let i = self.index(radial, gate);
        self.grid.float_array("TerrainCBBPercent").unwrap()[i]
    }

    pub fn terrain_pbb(&self, radial: usize, gate: usize) -> f32 {
        if !self.has_terrain() {
            return 0.0;
        }
        let i = self.index(radial, gate);
        self.grid.float_array("TerrainPBBPercent").unwrap()[i]
    }

    pub fn set_terrain(&mut self, radial: usize, gate: usize, cbb: f32, pbb: f32, beam_bottom_hit: bool) {
        self.ensure_terrain_arrays();
        let i = self.index(radial, gate);
        self.grid.float_array_mut("TerrainCBBPercent").unwrap()[i] = cbb;
        self.grid.float_array_mut("TerrainPBBPercent").unwrap()[i] = pbb;
        if let ArrayStorage::Byte(v) = &mut self.grid.array_mut("TerrainBeamBottomHit").unwrap().storage {
            v[i] = beam_bottom_hit as u8;
        }
    }

    /// The radial whose azimuth is closest to `azimuth_deg`, by circular
    /// distance. Linear scan — tilts carry a few hundred radials, and
    /// this runs once per (radar, grid cell) pair, not per frame.
    pub fn radial_for_azimuth(&self, azimuth_deg: f64) -> usize {
        let mut best = 0usize;
        let mut best_diff = f64::MAX;
        for r in 0..self.num_radials() {
            let mut diff = (self.azimuth_deg(r) - azimuth_deg).abs();
            if diff > 180.0 {
                diff = 360.0 - diff;
            }
            if diff < best_diff {
                best_diff = diff;
                best = r;
            }
        }
        best
    }

    /// The gate index along `radial` whose center is closest to
    /// `range_km`, or `None` if that range falls before the first gate
    /// or past the last one.
    pub fn gate_for_range(&self, radial: usize, range_km: f64) -> Option<usize> {
        let range_m = range_km * 1000.0;
        if range_m < self.distance_to_first_gate_m {
            return None;
        }
        let gate_width_m = self.gate_width_m(radial);
        if gate_width_m <= 0.0 {
            return None;
        }
        let g = ((range_m - self.distance_to_first_gate_m) / gate_width_m).round();
        if g < 0.0 || g as usize >= self.num_gates() {
            None
        } else {
            Some(g as usize)
        }
    }

    /// Find the `(radial, gate)` nearest `(azimuth_deg, range_km)`,
    /// `None` if the range falls outside this tilt's gates entirely.
    pub fn sample_at(&self, azimuth_deg: f64, range_km: f64) -> Option<(usize, usize)> {
        let radial = self.radial_for_azimuth(azimuth_deg);
        self.gate_for_range(radial, range_km).map(|gate| (radial, gate))
    }

    pub fn beam_bottom_hit(&self, radial: usize, gate: usize) -> bool {
        if !self.has_terrain() {
            return false;
        }
        let i = self.index(radial, gate);
        match &self.grid.array("TerrainBeamBottomHit").unwrap().storage {
            ArrayStorage::Byte(v) => v[i] != 0,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_with_default_unavailable_values() {
        let rs = RadialSet::new("KTLX", LLH::new(35.33, -97.27, 417.0), 0.5, 1000.0, 4, 8);
        assert_eq!(rs.num_radials(), 4);
        assert_eq!(rs.num_gates(), 8);
        assert_eq!(rs.value(0, 0), fusion_common::constants::DATA_UNAVAILABLE);
        assert!(!rs.has_terrain());
    }

    #[test]
    fn sample_at_finds_the_nearest_radial_and_gate() {
        let mut rs = RadialSet::new("KTLX", LLH::new(35.33, -97.27, 417.0), 0.5, 1000.0, 4, 10);
        for r in 0..4 {
            rs.set_azimuth_deg(r, r as f64 * 90.0);
        }
        rs.set_value(1, 3, 42.0);
        let (radial, gate) = rs.sample_at(92.0, 1.75).unwrap();
        assert_eq!(radial, 1);
        assert_eq!(gate, 3);
        assert_eq!(rs.value(radial, gate), 42.0);
    }

    #[test]
    fn sample_at_returns_none_before_the_first_gate() {
        let rs = RadialSet::new("KTLX", LLH::new(35.33, -97.27, 417.0), 0.5, 1000.0, 4, 10);
        assert!(rs.sample_at(0.0, 0.1).is_none());
    }

    #[test]
    fn terrain_overlay_round_trips() {
        let mut rs = RadialSet::new("KTLX", LLH::new(35.33, -97.27, 417.0), 0.5, 1000.0, 2, 2);
        rs.set_terrain(1, 1, 0.25, 0.75, true);
        assert!(rs.has_terrain());
        assert_eq!(rs.terrain_cbb(1, 1), 0.25);
        assert_eq!(rs.terrain_pbb(1, 1), 0.75);
        assert!(rs.beam_bottom_hit(1, 1));
        assert!(!rs.beam_bottom_hit(0, 0));
    }
}
