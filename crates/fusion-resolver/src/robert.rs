//! A simpler linear-interpolation resolver: blends the two immediately
//! enclosing tilts by inverse distance to the target elevation angle,
//! with no terrain discount or spread-aware weighting. Useful as a
//! sanity check against the default `lak` resolver.

use crate::query::{range_to_weight, ResolverOutput, ResolverQuery, TiltSample};
use crate::resolver::VolumeValueResolver;
use fusion_common::constants::{is_good, DATA_UNAVAILABLE, MISSING_DATA};

pub struct RobertLinearResolver;

impl RobertLinearResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RobertLinearResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn usable(sample: Option<TiltSample>) -> Option<TiltSample> {
    sample.filter(|s| is_good(s.value) && !s.beam_bottom_hit)
}

/// Terrain-corrected value for one tilt: `v * (1 - CBB)`, per SPEC_FULL
/// §4.3, the same correction `lak` applies by excluding heavily-blocked
/// tilts outright rather than discounting them.
fn cbb_corrected(s: &TiltSample) -> f64 {
    s.value as f64 * (1.0 - s.terrain_cbb as f64)
}

impl VolumeValueResolver for RobertLinearResolver {
    fn calc(&self, q: &ResolverQuery) -> ResolverOutput {
        let lower = usable(q.lower);
        let upper = usable(q.upper);

        let avg_value = match (lower, upper) {
            (Some(l), Some(u)) => {
                let dl = (q.target_elev_deg - l.elevation_deg).abs();
                let du = (u.elevation_deg - q.target_elev_deg).abs();
                let total = dl + du;
                if total <= 0.0 {
                    Some(cbb_corrected(&l))
                } else {
                    Some((cbb_corrected(&l) * du + cbb_corrected(&u) * dl) / total)
                }
            }
            (Some(l), None) => Some(cbb_corrected(&l)),
            (None, Some(u)) => Some(cbb_corrected(&u)),
            (None, None) => None,
        };

        match avg_value {
            Some(v) => {
                let rw = range_to_weight(q.virtual_range_km, q.variance_weight);
                ResolverOutput {
                    value_times_weight: q.global_weight * rw * v,
                    weight: q.global_weight * rw,
                }
            }
            None => {
                // Mask to MissingData only when both beam-pair samples are
                // present and maskable; otherwise there was simply no tilt
                // covering this cell at all.
                let missing_mask = match (q.lower, q.upper) {
                    (Some(l), Some(u)) => l.mask && u.mask,
                    _ => false,
                };
                let data_value = if missing_mask { MISSING_DATA } else { DATA_UNAVAILABLE };
                ResolverOutput {
                    value_times_weight: data_value as f64,
                    weight: 1.0,
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "robert"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: f32, elevation_deg: f64) -> TiltSample {
        TiltSample {
            value,
            elevation_deg,
            terrain_cbb: 0.0,
            beam_bottom_hit: false,
            azimuth_deg: 0.0,
            range_km: 50.0,
            mask: true,
        }
    }

    #[test]
    fn interpolates_linearly_between_tilts() {
        let resolver = RobertLinearResolver::new();
        let q = ResolverQuery {
            lower: Some(sample(10.0, 0.0)),
            upper: Some(sample(20.0, 2.0)),
            second_lower: None,
            second_upper: None,
            target_elev_deg: 0.5,
            virtual_range_km: 50.0,
            global_weight: 1.0,
            variance_weight: 0.00005,
        };
        let out = resolver.calc(&q);
        assert!((out.resolved_value() - 12.5).abs() < 0.01);
    }

    #[test]
    fn falls_back_to_the_one_present_tilt() {
        let resolver = RobertLinearResolver::new();
        let q = ResolverQuery {
            lower: Some(sample(10.0, 0.0)),
            upper: None,
            second_lower: None,
            second_upper: None,
            target_elev_deg: 0.5,
            virtual_range_km: 50.0,
            global_weight: 1.0,
            variance_weight: 0.00005,
        };
        let out = resolver.calc(&q);
        assert!((out.resolved_value() - 10.0).abs() < 0.01);
    }

    #[test]
    fn applies_the_terrain_cbb_correction_per_tilt() {
        let resolver = RobertLinearResolver::new();
        let mut lower = sample(10.0, 0.0);
        lower.terrain_cbb = 0.5;
        let mut upper = sample(20.0, 2.0);
        upper.terrain_cbb = 0.25;
        let q = ResolverQuery {
            lower: Some(lower),
            upper: Some(upper),
            second_lower: None,
            second_upper: None,
            target_elev_deg: 0.5,
            virtual_range_km: 50.0,
            global_weight: 1.0,
            variance_weight: 0.00005,
        };
        let out = resolver.calc(&q);
        // v_lower = 10 * 0.5 = 5, v_upper = 20 * 0.75 = 15
        assert!((out.resolved_value() - 8.75).abs() < 0.01);
    }

    #[test]
    fn missing_in_beam_pair_reports_missing_data_when_maskable() {
        let resolver = RobertLinearResolver::new();
        let mut lower = sample(10.0, 0.0);
        lower.beam_bottom_hit = true;
        let mut upper = sample(20.0, 2.0);
        upper.beam_bottom_hit = true;
        let q = ResolverQuery {
            lower: Some(lower),
            upper: Some(upper),
            second_lower: None,
            second_upper: None,
            target_elev_deg: 0.5,
            virtual_range_km: 50.0,
            global_weight: 1.0,
            variance_weight: 0.00005,
        };
        let out = resolver.calc(&q);
        assert_eq!(out.value_times_weight, MISSING_DATA as f64);
    }

    #[test]
    fn no_enclosing_tilt_at_all_reports_data_unavailable() {
        let resolver = RobertLinearResolver::new();
        let q = ResolverQuery {
            lower: None,
            upper: None,
            second_lower: None,
            second_upper: None,
            target_elev_deg: 0.5,
            virtual_range_km: 50.0,
            global_weight: 1.0,
            variance_weight: 0.00005,
        };
        let out = resolver.calc(&q);
        assert_eq!(out.value_times_weight, DATA_UNAVAILABLE as f64);
    }
}
