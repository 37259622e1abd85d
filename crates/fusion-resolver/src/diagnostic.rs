//! Diagnostic resolvers: instead of a merged reflectivity-like value,
//! each reports one piece of the geometry that picked it, for tuning
//! and validating the pipeline visually (per-gate range, azimuth, or
//! terrain blockage maps) rather than an actual weather product.

use crate::query::{ResolverOutput, ResolverQuery, TiltSample};
use crate::resolver::VolumeValueResolver;
use fusion_common::constants::DATA_UNAVAILABLE;

fn nearest(q: &ResolverQuery) -> Option<TiltSample> {
    let candidates = [q.lower, q.upper, q.second_lower, q.second_upper];
    candidates
        .into_iter()
        .flatten()
        .min_by(|a, b| {
            let da = (q.target_elev_deg - a.elevation_deg).abs();
            let db = (q.target_elev_deg - b.elevation_deg).abs();
            da.partial_cmp(&db).unwrap()
        })
}

fn diagnostic_output(value: Option<f64>) -> ResolverOutput {
    match value {
        Some(v) => ResolverOutput {
            value_times_weight: v,
            weight: 1.0,
        },
        None => ResolverOutput {
            value_times_weight: DATA_UNAVAILABLE as f64,
            weight: 1.0,
        },
    }
}

pub struct RangeVVResolver;

impl VolumeValueResolver for RangeVVResolver {
    fn calc(&self, q: &ResolverQuery) -> ResolverOutput {
        diagnostic_output(nearest(q).map(|s| s.range_km))
    }

    fn name(&self) -> &'static str {
        "range"
    }
}

pub struct AzimuthVVResolver;

impl VolumeValueResolver for AzimuthVVResolver {
    fn calc(&self, q: &ResolverQuery) -> ResolverOutput {
        diagnostic_output(nearest(q).map(|s| s.azimuth_deg))
    }

    fn name(&self) -> &'static str {
        "azimuth"
    }
}

pub struct TerrainVVResolver;

impl VolumeValueResolver for TerrainVVResolver {
    fn calc(&self, q: &ResolverQuery) -> ResolverOutput {
        let value = match q.lower {
            Some(l) if !l.beam_bottom_hit => {
                let cbb = l.terrain_cbb as f64;
                Some(cbb * cbb * 100.0 * 100.0)
            }
            _ => None,
        };
        diagnostic_output(value)
    }

    fn name(&self) -> &'static str {
        "terrain"
    }
}

pub struct NearestVVResolver;

impl VolumeValueResolver for NearestVVResolver {
    fn calc(&self, q: &ResolverQuery) -> ResolverOutput {
        diagnostic_output(nearest(q).map(|s| s.value as f64))
    }

    fn name(&self) -> &'static str {
        "nearest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: f32, elevation_deg: f64, range_km: f64, azimuth_deg: f64) -> TiltSample {
        TiltSample {
            value,
            elevation_deg,
            terrain_cbb: 0.1,
            beam_bottom_hit: false,
            azimuth_deg,
            range_km,
            mask: true,
        }
    }

    #[test]
    fn range_resolver_reports_nearest_tilts_range() {
        let q = ResolverQuery {
            lower: Some(sample(10.0, 0.5, 40.0, 10.0)),
            upper: Some(sample(20.0, 1.5, 60.0, 10.0)),
            second_lower: None,
            second_upper: None,
            target_elev_deg: 0.6,
            virtual_range_km: 40.0,
            global_weight: 1.0,
            variance_weight: 0.00005,
        };
        let out = RangeVVResolver.calc(&q);
        assert_eq!(out.value_times_weight, 40.0);
    }

    #[test]
    fn empty_query_reports_data_unavailable() {
        let q = ResolverQuery::default();
        let out = AzimuthVVResolver.calc(&q);
        assert_eq!(out.value_times_weight, DATA_UNAVAILABLE as f64);
    }

    #[test]
    fn terrain_resolver_scales_the_lower_tilts_cbb() {
        let mut lower = sample(10.0, 0.5, 40.0, 10.0);
        lower.terrain_cbb = 0.3;
        let q = ResolverQuery {
            lower: Some(lower),
            upper: Some(sample(20.0, 1.5, 60.0, 10.0)),
            second_lower: None,
            second_upper: None,
            target_elev_deg: 0.6,
            virtual_range_km: 40.0,
            global_weight: 1.0,
            variance_weight: 0.00005,
        };
        let out = TerrainVVResolver.calc(&q);
        assert!((out.value_times_weight - 900.0).abs() < 1e-6);
    }

    #[test]
    fn terrain_resolver_reports_data_unavailable_when_beam_hit_bottom() {
        let mut lower = sample(10.0, 0.5, 40.0, 10.0);
        lower.beam_bottom_hit = true;
        let q = ResolverQuery {
            lower: Some(lower),
            upper: None,
            second_lower: None,
            second_upper: None,
            target_elev_deg: 0.6,
            virtual_range_km: 40.0,
            global_weight: 1.0,
            variance_weight: 0.00005,
        };
        let out = TerrainVVResolver.calc(&q);
        assert_eq!(out.value_times_weight, DATA_UNAVAILABLE as f64);
    }
}
