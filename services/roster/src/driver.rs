//! The nearest-N coordinator itself: each tick, scan every radar's
//! `.cache` file under this grid's directory, run the nearest-N merge in
//! `fusion_cache::build_masks`, and write back each radar's `.mask` file.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use fusion_cache::{grid_fingerprint, MaskFile, RangeCacheFile};
use fusion_common::error::{io_error, FusionResult};
use fusion_common::time::EpochSeconds;
use fusion_containers::Bitset;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;

/// One heartbeat tick's outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickStats {
    pub sources_seen: u64,
    pub sources_stale_skipped: u64,
    pub sources_fingerprint_mismatch: u64,
    pub masks_written: u64,
    pub masks_deleted: u64,
}

/// Coordinates the cache-directory scan, nearest-N merge, and mask
/// write-back for one grid definition.
pub struct RosterDriver {
    config: Config,
    fingerprint: u64,
    grid_dir: PathBuf,
    /// Radar name -> stable process-local id, allocated on first sight.
    /// 0 is reserved (`build_masks` treats it as "no source").
    ids: HashMap<String, u32>,
    next_id: u32,
}

impl RosterDriver {
    pub fn new(config: Config) -> FusionResult<Self> {
        let fingerprint = grid_fingerprint(&config.global_area);
        let grid_dir = Path::new(&config.roster_dir).join(format!("GRID_{fingerprint:016x}"));
        Ok(Self {
            config,
            fingerprint,
            grid_dir,
            ids: HashMap::new(),
            next_id: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn active_dir(&self) -> PathBuf {
        self.grid_dir.join("active")
    }

    fn mask_dir(&self) -> PathBuf {
        self.grid_dir.join("mask")
    }

    fn allocate_id(&mut self, radar_name: &str) -> u32 {
        if let Some(&id) = self.ids.get(radar_name) {
            return id;
        }
        loop {
            self.next_id = self.next_id.wrapping_add(1);
            if self.next_id != 0 {
                break;
            }
        }
        self.ids.insert(radar_name.to_string(), self.next_id);
        self.next_id
    }

    /// Run one sync tick: read every radar's `.cache`, merge, write masks.
    pub fn tick(&mut self, now: EpochSeconds) -> FusionResult<TickStats> {
        std::fs::create_dir_all(self.active_dir())
            .map_err(|e| io_error(self.active_dir().display().to_string(), e))?;
        std::fs::create_dir_all(self.mask_dir())
            .map_err(|e| io_error(self.mask_dir().display().to_string(), e))?;

        let mut stats = TickStats::default();
        let mut sources = Vec::new();
        let mut cache_by_name: HashMap<String, RangeCacheFile> = HashMap::new();

        for entry in WalkDir::new(self.active_dir())
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("cache") {
                continue;
            }

            if !self.config.static_mode {
                if let Some(modified_epoch) = file_modified_epoch(&entry) {
                    let cutoff = now - self.config.history_window_secs;
                    if modified_epoch < cutoff {
                        debug!(path = %path.display(), "skipping stale cache file");
                        stats.sources_stale_skipped += 1;
                        continue;
                    }
                }
            }

            let file = match File::open(path) {
                Ok(f) => f,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to open cache file, skipping");
                    continue;
                }
            };
            let cache = match RangeCacheFile::read_from(file) {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read cache file, skipping");
                    continue;
                }
            };

            if cache.fingerprint != self.fingerprint {
                warn!(
                    radar = %cache.radar_name,
                    "cache fingerprint does not match this grid definition, skipping"
                );
                stats.sources_fingerprint_mismatch += 1;
                continue;
            }

            let id = self.allocate_id(&cache.radar_name);
            sources.push(fusion_cache::SourceRanges {
                name: cache.radar_name.clone(),
                id,
                start_x: cache.start_x as usize,
                start_y: cache.start_y as usize,
                num_x: cache.num_x as usize,
                num_y: cache.num_y as usize,
                num_z: cache.num_z as usize,
                ranges_km: cache.ranges_km.clone(),
            });
            cache_by_name.insert(cache.radar_name.clone(), cache);
        }

        stats.sources_seen = sources.len() as u64;

        let full_num_x = self.config.global_area.num_x;
        let full_num_y = self.config.global_area.num_y;
        let full_num_z = self.config.global_area.num_z();

        let masks = fusion_cache::build_masks(
            full_num_x,
            full_num_y,
            full_num_z,
            self.config.nearest,
            &sources,
        );

        let mut seen: HashSet<String> = HashSet::new();
        for (name, bitset) in &masks {
            let cache = match cache_by_name.get(name) {
                Some(c) => c,
                None => continue,
            };
            match self.write_mask(name, cache, bitset) {
                Ok(()) => {
                    stats.masks_written += 1;
                    seen.insert(name.clone());
                }
                Err(e) => warn!(radar = %name, error = %e, "failed to write mask file"),
            }
        }

        stats.masks_deleted = self.delete_stale_masks(&seen)?;

        info!(
            sources_seen = stats.sources_seen,
            stale_skipped = stats.sources_stale_skipped,
            fingerprint_mismatch = stats.sources_fingerprint_mismatch,
            masks_written = stats.masks_written,
            masks_deleted = stats.masks_deleted,
            "roster tick complete"
        );

        Ok(stats)
    }

    fn write_mask(&self, name: &str, cache: &RangeCacheFile, mask: &Bitset) -> FusionResult<()> {
        let file = MaskFile {
            radar_name: name.to_string(),
            fingerprint: self.fingerprint,
            start_x: cache.start_x,
            start_y: cache.start_y,
            num_x: cache.num_x,
            num_y: cache.num_y,
            num_z: cache.num_z,
            mask: mask.clone(),
        };

        let mask_dir = self.mask_dir();
        let final_path = mask_dir.join(format!("{name}.mask"));
        let tmp_path = mask_dir.join(format!("{name}.mask.tmp"));

        {
            let f = File::create(&tmp_path).map_err(|e| io_error(tmp_path.display().to_string(), e))?;
            file.write_to(BufWriter::new(f))?;
        }
        std::fs::rename(&tmp_path, &final_path)
            .map_err(|e| io_error(final_path.display().to_string(), e))?;
        Ok(())
    }

    /// Delete `.mask` files for radars that did not contribute this tick,
    /// matching `build_masks`' guarantee that the union of surviving masks
    /// covers every cell any surviving radar could write to.
    fn delete_stale_masks(&self, seen: &HashSet<String>) -> FusionResult<u64> {
        let mask_dir = self.mask_dir();
        if !mask_dir.exists() {
            return Ok(0);
        }

        let mut deleted = 0u64;
        for entry in std::fs::read_dir(&mask_dir)
            .map_err(|e| io_error(mask_dir.display().to_string(), e))?
        {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("mask") {
                continue;
            }
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s,
                None => continue,
            };
            if !seen.contains(stem) {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "failed to remove stale mask file");
                    continue;
                }
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// A `.cache` file's modification time as whole epoch seconds, or `None`
/// if the filesystem can't report one (clock skew before the Unix epoch,
/// or the walk raced a delete).
fn file_modified_epoch(entry: &walkdir::DirEntry) -> Option<i64> {
    let modified = entry.metadata().ok()?.modified().ok()?;
    let secs = modified
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_secs();
    Some(secs as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_common::coverage::LLCoverageArea;

    fn test_config(roster_dir: &Path) -> Config {
        let mut area = LLCoverageArea::default();
        area.set(55.0, -130.0, 20.0, -60.0, 1.0, 1.0, 4, 4);
        Config {
            global_area: area,
            roster_dir: roster_dir.display().to_string(),
            nearest: 2,
            static_mode: true,
            sync_expr: "0 * * * * *".to_string(),
            history_window_secs: 900,
        }
    }

    fn write_cache(driver: &RosterDriver, radar: &str, start_x: u32, start_y: u32, range_km: f32) {
        let cache = RangeCacheFile {
            radar_name: radar.to_string(),
            fingerprint: driver.fingerprint,
            start_x,
            start_y,
            num_x: 2,
            num_y: 2,
            num_z: 1,
            ranges_km: vec![range_km; 4],
        };
        std::fs::create_dir_all(driver.active_dir()).unwrap();
        let path = driver.active_dir().join(format!("{radar}.cache"));
        let f = File::create(&path).unwrap();
        cache.write_to(BufWriter::new(f)).unwrap();
    }

    #[test]
    fn allocate_id_is_stable_and_skips_zero() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = RosterDriver::new(test_config(dir.path())).unwrap();
        let a1 = driver.allocate_id("KTLX");
        let a2 = driver.allocate_id("KTLX");
        let b1 = driver.allocate_id("KFWS");
        assert_eq!(a1, a2);
        assert_ne!(a1, b1);
        assert_ne!(a1, 0);
        assert_ne!(b1, 0);
    }

    #[test]
    fn tick_writes_one_mask_per_contributing_radar() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = RosterDriver::new(test_config(dir.path())).unwrap();
        write_cache(&driver, "KTLX", 0, 0, 50.0);
        write_cache(&driver, "KFWS", 2, 0, 80.0);

        let stats = driver.tick(1_000_000).unwrap();
        assert_eq!(stats.sources_seen, 2);
        assert_eq!(stats.masks_written, 2);

        let ktlx_mask = driver.mask_dir().join("KTLX.mask");
        let kfws_mask = driver.mask_dir().join("KFWS.mask");
        assert!(ktlx_mask.exists());
        assert!(kfws_mask.exists());
    }

    #[test]
    fn a_radar_missing_next_tick_loses_its_mask() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = RosterDriver::new(test_config(dir.path())).unwrap();
        write_cache(&driver, "KTLX", 0, 0, 50.0);
        driver.tick(1_000_000).unwrap();
        assert!(driver.mask_dir().join("KTLX.mask").exists());

        std::fs::remove_file(driver.active_dir().join("KTLX.cache")).unwrap();
        let stats = driver.tick(1_000_100).unwrap();
        assert_eq!(stats.sources_seen, 0);
        assert_eq!(stats.masks_deleted, 1);
        assert!(!driver.mask_dir().join("KTLX.mask").exists());
    }

    #[test]
    fn mismatched_fingerprint_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = RosterDriver::new(test_config(dir.path())).unwrap();
        let cache = RangeCacheFile {
            radar_name: "KTLX".to_string(),
            fingerprint: driver.fingerprint.wrapping_add(1),
            start_x: 0,
            start_y: 0,
            num_x: 2,
            num_y: 2,
            num_z: 1,
            ranges_km: vec![50.0; 4],
        };
        std::fs::create_dir_all(driver.active_dir()).unwrap();
        let f = File::create(driver.active_dir().join("KTLX.cache")).unwrap();
        cache.write_to(BufWriter::new(f)).unwrap();

        let stats = driver.tick(1_000_000).unwrap();
        assert_eq!(stats.sources_seen, 0);
        assert_eq!(stats.sources_fingerprint_mismatch, 1);
    }
}
