//! The default volume-value resolver: weighs each enclosing tilt by
//! how far its nominal elevation angle is from the angle that would
//! exactly hit the target cell, normalized by the spread between
//! tilts, then falls back to a mask-derived `MissingData`/
//! `DataUnavailable` decision when no tilt clears threshold.

use crate::query::{range_to_weight, ResolverOutput, ResolverQuery, TiltSample};
use crate::resolver::VolumeValueResolver;
use fusion_common::constants::{is_good, DATA_UNAVAILABLE, MISSING_DATA, RANGE_FOLDED};

const TERRAIN_PERCENT: f64 = 0.50;
const MAX_SPREAD_DEGS: f64 = 4.0;
const ELEV_THRESH: f64 = 0.45;

fn elev_factor() -> f64 {
    0.005f64.ln()
}

#[derive(Default, Clone, Copy)]
struct TiltContribution {
    count: u32,
    weight_sum: f64,
    value_weight_sum: f64,
    mask: bool,
    in_thresh: bool,
}

fn process_tilt(sample: Option<TiltSample>, spread_degs: f64, target_elev_deg: f64) -> TiltContribution {
    let Some(s) = sample else {
        return TiltContribution::default();
    };

    if s.terrain_cbb as f64 > TERRAIN_PERCENT || s.beam_bottom_hit {
        return TiltContribution::default();
    }

    let alpha_top = (target_elev_deg - s.elevation_deg).abs();
    let spread_reasonable = spread_degs > 1.0 && spread_degs <= MAX_SPREAD_DEGS;
    let alpha_bottom = if spread_reasonable { spread_degs } else { 1.0 };

    let weight = ((alpha_top / alpha_bottom).powi(3) * elev_factor()).exp();
    let thresh = weight > ELEV_THRESH;
    let is_maskable_value = s.value != DATA_UNAVAILABLE && s.value != RANGE_FOLDED;
    let do_count = is_good(s.value) && thresh;

    TiltContribution {
        count: do_count as u32,
        weight_sum: if do_count { weight } else { 0.0 },
        value_weight_sum: if do_count { weight * s.value as f64 } else { 0.0 },
        mask: s.mask,
        in_thresh: thresh && is_maskable_value,
    }
}

pub struct LakResolver1;

impl LakResolver1 {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LakResolver1 {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeValueResolver for LakResolver1 {
    fn calc(&self, q: &ResolverQuery) -> ResolverOutput {
        let spread = match (q.lower, q.upper) {
            (Some(l), Some(u)) => (u.elevation_deg - l.elevation_deg).abs(),
            _ => 0.0,
        };
        let spread_2nd_lower = match (q.second_lower, q.upper) {
            (Some(ll), Some(u)) => (u.elevation_deg - ll.elevation_deg).abs(),
            _ => 0.0,
        };
        let spread_2nd_upper = match (q.lower, q.second_upper) {
            (Some(l), Some(uu)) => (uu.elevation_deg - l.elevation_deg).abs(),
            _ => 0.0,
        };

        let lower = process_tilt(q.lower, spread, q.target_elev_deg);
        let upper = process_tilt(q.upper, spread, q.target_elev_deg);
        let second_lower = process_tilt(q.second_lower, spread_2nd_lower, q.target_elev_deg);
        let second_upper = process_tilt(q.second_upper, spread_2nd_upper, q.target_elev_deg);

        let count = lower.count + upper.count + second_lower.count + second_upper.count;
        let total_wt = lower.weight_sum + upper.weight_sum + second_lower.weight_sum + second_upper.weight_sum;
        let total_sum =
            lower.value_weight_sum + upper.value_weight_sum + second_lower.value_weight_sum + second_upper.value_weight_sum;

        if count > 0 {
            let rw = range_to_weight(q.virtual_range_km, q.variance_weight);
            let avg_value = total_sum / total_wt;
            ResolverOutput {
                value_times_weight: q.global_weight * rw * avg_value,
                weight: q.global_weight * rw,
            }
        } else {
            let missing_mask = (lower.in_thresh && lower.mask)
                || (upper.in_thresh && upper.mask)
                || (second_upper.in_thresh && second_upper.mask)
                || (second_lower.in_thresh && second_lower.mask)
                || (lower.mask && upper.mask);
            let data_value = if missing_mask { MISSING_DATA } else { DATA_UNAVAILABLE };
            ResolverOutput {
                value_times_weight: data_value as f64,
                weight: 1.0,
            }
        }
    }

    fn name(&self) -> &'static str {
        "lak"
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
    fn averages_well_aligned_enclosing_tilts() {
        let resolver = LakResolver1::new();
        let q = ResolverQuery {
            lower: Some(sample(20.0, 0.5)),
            upper: Some(sample(30.0, 1.5)),
            second_lower: None,
            second_upper: None,
            target_elev_deg: 1.0,
            virtual_range_km: 50.0,
            global_weight: 1.0,
            variance_weight: 0.00005,
        };
        let out = resolver.calc(&q);
        assert!(out.weight > 0.0);
        let v = out.resolved_value();
        assert!(v > 19.0 && v < 31.0);
    }

    #[test]
    fn terrain_blocked_tilt_is_excluded() {
        let resolver = LakResolver1::new();
        let mut blocked = sample(20.0, 0.5);
        blocked.terrain_cbb = 0.9;
        let q = ResolverQuery {
            lower: Some(blocked),
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

    #[test]
    fn lone_out_of_threshold_tilt_is_data_unavailable_not_missing() {
        let resolver = LakResolver1::new();
        let mut far = sample(20.0, 10.0);
        far.mask = true;
        let q = ResolverQuery {
            lower: Some(far),
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
