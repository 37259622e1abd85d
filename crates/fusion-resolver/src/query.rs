//! The per-cell, per-tilt inputs a `VolumeValueResolver` consumes. A
//! `fusion-volume::VolumeManager::query_enclosing` result plus the
//! terrain overlay on each enclosing `RadialSet` is reduced down to
//! this before the resolver ever runs, so the resolver itself never
//! touches a `RadialSet` directly.

/// What a resolver knows about a single enclosing tilt at the queried
/// azimuth/range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltSample {
    pub value: f32,
    pub elevation_deg: f64,
    pub terrain_cbb: f32,
    pub beam_bottom_hit: bool,
    pub azimuth_deg: f64,
    pub range_km: f64,
    /// Whether the roster's nearest-N mask says this radar contributes
    /// this cell at all; used only to decide between `MissingData` and
    /// `DataUnavailable` when no tilt actually counts.
    pub mask: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolverQuery {
    pub lower: Option<TiltSample>,
    pub upper: Option<TiltSample>,
    pub second_lower: Option<TiltSample>,
    pub second_upper: Option<TiltSample>,
    /// Elevation angle, in degrees, the beam would need to exactly hit
    /// the target cell at its height and ground range.
    pub target_elev_deg: f64,
    /// Ground range from the radar to the target cell, in kilometers.
    pub virtual_range_km: f64,
    /// A per-radar weight (e.g. derived from roster nearest-N rank)
    /// applied uniformly to whatever this resolver outputs.
    pub global_weight: f64,
    /// Tunes how fast `range_to_weight` falls off with range.
    pub variance_weight: f64,
}

/// A resolver's output is always a (numerator, denominator) pair so
/// Stage 2's weighted-average merge (`mergeTo`) can accumulate several
/// radars' contributions to one cell without each resolver needing to
/// know about the others.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverOutput {
    pub value_times_weight: f64,
    pub weight: f64,
}

impl ResolverOutput {
    pub fn resolved_value(&self) -> f32 {
        if self.weight <= 0.0 {
            fusion_common::constants::DATA_UNAVAILABLE
        } else {
            (self.value_times_weight / self.weight) as f32
        }
    }
}

/// `exp(-(r^2) * variance)`: a radar's contribution fades with ground
/// range, tuned per radar network by `variance_weight`.
pub fn range_to_weight(range_km: f64, variance_weight: f64) -> f64 {
    (-(range_km * range_km) * variance_weight).exp()
}
