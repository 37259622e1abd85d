//! Terrain blockage modeling: the fraction of a radar beam's power
//! intercepted by terrain at each gate, computed once per radial set
//! and stored alongside it (`RadialSet::ensure_terrain_arrays`) so
//! volume-value resolvers can discount or discard blocked gates.

pub mod bech2me;
pub mod blockage;
pub mod dem;
pub mod error;
pub mod lak_ray;

pub use bech2me::Bech2me;
pub use blockage::{calculate_terrain_per_gate, GateBlockage, TerrainBlockage};
pub use dem::Dem;
pub use error::{TerrainError, TerrainResult};
pub use lak_ray::LakRayPencil;

/// Build a named terrain model with its default configuration. Mirrors
/// the volume-value resolver registry (`fusion_resolver::registry`):
/// new models are added here, not discovered dynamically.
pub fn build_model(name: &str) -> TerrainResult<Box<dyn TerrainBlockage>> {
    match name {
        "bech2me" => Ok(Box::new(Bech2me::new(0.05))),
        "lak" => Ok(Box::new(LakRayPencil::new())),
        other => Err(TerrainError::UnknownModel(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_known_models() {
        assert!(build_model("bech2me").is_ok());
        assert!(build_model("lak").is_ok());
    }

    #[test]
    fn rejects_unknown_model() {
        assert!(build_model("nonexistent").is_err());
    }
}
