use fusion_common::error::{FusionError, FusionResult};

use crate::diagnostic::{AzimuthVVResolver, NearestVVResolver, RangeVVResolver, TerrainVVResolver};
use crate::lak::LakResolver1;
use crate::resolver::VolumeValueResolver;
use crate::robert::RobertLinearResolver;

/// Build a named resolver with its default configuration. `-resolver`
/// CLI argument values on the Stage 1 driver come straight through to
/// this; unknown names fail configuration up front rather than at the
/// first cell processed.
pub fn build_resolver(name: &str) -> FusionResult<Box<dyn VolumeValueResolver>> {
    match name {
        "lak" => Ok(Box::new(LakResolver1::new())),
        "robert" => Ok(Box::new(RobertLinearResolver::new())),
        "nearest" => Ok(Box::new(NearestVVResolver)),
        "range" => Ok(Box::new(RangeVVResolver)),
        "azimuth" => Ok(Box::new(AzimuthVVResolver)),
        "terrain" => Ok(Box::new(TerrainVVResolver)),
        other => Err(FusionError::UnknownResolver(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_every_known_resolver_name() {
        for name in ["lak", "robert", "nearest", "range", "azimuth", "terrain"] {
            assert!(build_resolver(name).is_ok(), "{name} should build");
        }
    }

    #[test]
    fn rejects_unknown_resolver_name() {
        assert!(build_resolver("bogus").is_err());
    }
}
