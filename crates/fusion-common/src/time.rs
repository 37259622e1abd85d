//! Time helpers shared by the observation store and the per-tick heartbeat.
//!
//! Every stage reasons about time as Unix seconds internally (that's what
//! gets compared against per-cell "last seen" timestamps in the merge
//! database), with `chrono::DateTime<Utc>` at the edges for logging and
//! CLI parsing.

use chrono::{DateTime, Utc};

/// Unix-epoch seconds, the unit the observation store keeps per-cell
/// timestamps in.
pub type EpochSeconds = i64;

pub fn to_epoch_seconds(t: DateTime<Utc>) -> EpochSeconds {
    t.timestamp()
}

/// The cutoff time below which a stale per-source observation is dropped
/// rather than carried forward during a merge.
pub fn cutoff_seconds(at: DateTime<Utc>, max_age_secs: i64) -> EpochSeconds {
    at.timestamp() - max_age_secs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cutoff_is_earlier_than_at_time() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let cutoff = cutoff_seconds(at, 600);
        assert_eq!(at.timestamp() - cutoff, 600);
    }
}
