//! Keeps one `VirtualVolume` per (radar, moment) pair alive, sweeping
//! out tilts that have aged past their expiry on every heartbeat.

use std::collections::HashMap;

use fusion_common::time::EpochSeconds;
use fusion_datatypes::radial_set::RadialSet;

use crate::volume::{EnclosingTilts, VirtualVolume};

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct VolumeKey {
    pub radar_name: String,
    pub moment: String,
}

impl VolumeKey {
    pub fn new(radar_name: impl Into<String>, moment: impl Into<String>) -> Self {
        Self {
            radar_name: radar_name.into(),
            moment: moment.into(),
        }
    }
}

#[derive(Default)]
pub struct VolumeManager {
    volumes: HashMap<VolumeKey, VirtualVolume>,
}

impl VolumeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, moment: impl Into<String>, radial_set: RadialSet, received_at: EpochSeconds) {
        let key = VolumeKey::new(radial_set.radar_name.clone(), moment);
        self.volumes.entry(key).or_default().add(radial_set, received_at);
    }

    pub fn volume(&self, key: &VolumeKey) -> Option<&VirtualVolume> {
        self.volumes.get(key)
    }

    pub fn query_enclosing(&self, key: &VolumeKey, target_elev_deg: f64) -> EnclosingTilts<'_> {
        match self.volumes.get(key) {
            Some(v) => v.query_enclosing(target_elev_deg),
            None => EnclosingTilts::default(),
        }
    }

    /// Drop tilts older than `cutoff` from every tracked volume, and
    /// drop volumes left with no tilts at all. Returns the total number
    /// of tilts removed, for the driver's heartbeat log line.
    pub fn sweep_expired(&mut self, cutoff: EpochSeconds) -> usize {
        let mut removed = 0;
        self.volumes.retain(|_, v| {
            removed += v.expire(cutoff);
            !v.is_empty()
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_common::geo::LLH;

    fn rs(radar: &str, elev: f64) -> RadialSet {
        RadialSet::new(radar, LLH::new(35.33, -97.27, 417.0), elev, 1000.0, 4, 4)
    }

    #[test]
    fn ingest_buckets_by_radar_and_moment() {
        let mut mgr = VolumeManager::new();
        mgr.ingest("Reflectivity", rs("KTLX", 0.5), 100);
        mgr.ingest("Reflectivity", rs("KFWS", 0.5), 100);
        mgr.ingest("Velocity", rs("KTLX", 0.5), 100);
        assert_eq!(mgr.len(), 3);
    }

    #[test]
    fn sweep_removes_empty_volumes() {
        let mut mgr = VolumeManager::new();
        mgr.ingest("Reflectivity", rs("KTLX", 0.5), 100);
        let removed = mgr.sweep_expired(200);
        assert_eq!(removed, 1);
        assert!(mgr.is_empty());
    }
}
