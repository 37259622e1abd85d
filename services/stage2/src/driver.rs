//! The merge engine itself: on each tick, absorb every `.s2` message
//! stage1 has dropped for this partition and moment into `MergeDatabase`,
//! then finalize a weighted-average output layer per z-level and write
//! it for TileJoin (or a direct renderer) to pick up.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use fusion_cache::grid_fingerprint;
use fusion_common::error::{io_error, FusionResult};
use fusion_common::time::EpochSeconds;
use fusion_datatypes::LatLonGrid;
use fusion_merge::MergeDatabase;
use fusion_stage2::{MergedGridFile, Stage2Message};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    pub messages_ingested: u64,
    pub messages_skipped: u64,
    pub new_values: u64,
    pub new_missing: u64,
    pub restored: u64,
    pub dropped: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FinalizeStats {
    pub layers_written: u64,
}

/// One heartbeat's combined outcome: ingest, finalize, and purge.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickStats {
    pub messages_ingested: u64,
    pub messages_skipped: u64,
    pub layers_written: u64,
    pub purged: usize,
    pub source_count: usize,
}

pub struct Stage2Driver {
    config: Config,
    fingerprint: u64,
    db: MergeDatabase,
}

impl Stage2Driver {
    pub fn new(config: Config) -> Self {
        let fingerprint = grid_fingerprint(&config.global_area);
        Self {
            config,
            fingerprint,
            db: MergeDatabase::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source_count(&self) -> usize {
        self.db.source_count()
    }

    fn input_dir(&self) -> PathBuf {
        Path::new(&self.config.roster_dir)
            .parent()
            .map(|p| p.join("stage2_in"))
            .unwrap_or_else(|| PathBuf::from("stage2_in"))
            .join(format!("GRID_{:016x}", self.fingerprint))
    }

    fn output_dir(&self) -> PathBuf {
        Path::new(&self.config.roster_dir)
            .parent()
            .map(|p| p.join("stage2_out"))
            .unwrap_or_else(|| PathBuf::from("stage2_out"))
            .join(format!("GRID_{:016x}", self.fingerprint))
            .join(format!("partition_{}", self.config.partition_index))
    }

    /// Absorb every `.s2` file for this process's moment and partition,
    /// deleting each once ingested (a message is a point-in-time frame,
    /// not an incremental delta, so nothing is gained by keeping it).
    pub fn ingest_tick(&mut self, now: EpochSeconds) -> FusionResult<IngestStats> {
        let dir = self.input_dir();
        std::fs::create_dir_all(&dir).map_err(|e| io_error(dir.display().to_string(), e))?;

        let mut stats = IngestStats::default();
        let cutoff = now - self.config.observation_window_secs;
        let partition_str = self.config.partition_index.to_string();

        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("s2") {
                continue;
            }

            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s,
                None => continue,
            };
            let parts: Vec<&str> = stem.split('.').collect();
            if parts.len() != 4 || parts[1] != self.config.moment || parts[2] != partition_str {
                stats.messages_skipped += 1;
                continue;
            }

            let file = match File::open(path) {
                Ok(f) => f,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to open stage2 message, skipping");
                    continue;
                }
            };
            let msg = match Stage2Message::read_from(file) {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read stage2 message, skipping");
                    continue;
                }
            };

            let merge_stats = self.db.ingest(&msg, cutoff);
            stats.messages_ingested += 1;
            stats.new_values += merge_stats.new_values as u64;
            stats.new_missing += merge_stats.new_missing as u64;
            stats.restored += merge_stats.restored as u64;
            stats.dropped += merge_stats.dropped as u64;

            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "failed to remove consumed stage2 message");
            }
        }

        Ok(stats)
    }

    /// Finalize one merged output layer per z-level of this process's
    /// partition and write it for downstream consumption.
    pub fn finalize_tick(&self, now: EpochSeconds) -> FusionResult<FinalizeStats> {
        let out_dir = self.output_dir();
        std::fs::create_dir_all(&out_dir).map_err(|e| io_error(out_dir.display().to_string(), e))?;

        let cutoff = now - self.config.observation_window_secs;
        let area = &self.config.partition_area;
        let mut written = 0u64;

        for z in 0..area.num_z() {
            let values = self.db.merge_to(
                z as u32,
                area.start_x as u32,
                area.start_y as u32,
                area.num_x as u32,
                area.num_y as u32,
                cutoff,
            );

            let height_m = area.heights_km.get(z).copied().unwrap_or(0.0) * 1000.0;
            let mut grid = LatLonGrid::new(
                area.nw_lat_deg,
                area.nw_lon_deg,
                area.lat_spacing_deg,
                area.lon_spacing_deg,
                height_m,
                area.num_y,
                area.num_x,
            );
            for (idx, v) in values.into_iter().enumerate() {
                let x = idx % area.num_x;
                let y = idx / area.num_x;
                grid.set_value(y, x, v);
            }

            let merged = MergedGridFile::from_grid(&self.config.moment, &self.config.subtype, now, &grid);
            let name = format!("{}.{}.{}.{}.mg", self.config.moment, self.config.partition_index, z, now);
            let tmp = out_dir.join(format!("{name}.tmp"));
            let finalp = out_dir.join(&name);
            {
                let f = File::create(&tmp).map_err(|e| io_error(tmp.display().to_string(), e))?;
                merged.write_to(BufWriter::new(f))?;
            }
            std::fs::rename(&tmp, &finalp).map_err(|e| io_error(finalp.display().to_string(), e))?;
            written += 1;
        }

        info!(layers_written = written, "stage2 finalize complete");
        Ok(FinalizeStats { layers_written: written })
    }

    /// Drop observations older than the purge window across every source.
    pub fn time_purge(&mut self, now: EpochSeconds) -> usize {
        self.db.time_purge(now, self.config.purge_window_secs)
    }

    /// One heartbeat: absorb new messages, finalize the output layers,
    /// then purge. Order matters — a cell ingested this tick must be
    /// reflected in the layer this same tick writes.
    pub fn tick(&mut self, now: EpochSeconds) -> FusionResult<TickStats> {
        let ingest = self.ingest_tick(now)?;
        let finalize = self.finalize_tick(now)?;
        let purged = self.time_purge(now);

        Ok(TickStats {
            messages_ingested: ingest.messages_ingested,
            messages_skipped: ingest.messages_skipped,
            layers_written: finalize.layers_written,
            purged,
            source_count: self.db.source_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_common::coverage::LLCoverageArea;
    use fusion_stage2::Stage2MessageBuilder;

    fn test_config(roster_dir: &Path) -> Config {
        let mut area = LLCoverageArea::default();
        area.set(55.0, -130.0, 20.0, -60.0, 1.0, 1.0, 4, 4);
        Config {
            global_area: area.clone(),
            partition_area: area,
            partitions: fusion_partition::PartitionInfo::None,
            partition_index: 0,
            roster_dir: roster_dir.display().to_string(),
            moment: "Reflectivity".to_string(),
            subtype: String::new(),
            observation_window_secs: 300,
            purge_window_secs: 1800,
            sync_expr: "0 * * * * *".to_string(),
        }
    }

    fn write_message(driver: &Stage2Driver, radar: &str, time: EpochSeconds, cells: &[(u32, u32, f32)]) {
        let mut b = Stage2MessageBuilder::new(radar, "Reflectivity", time, 0, 0, 4, 4, 1);
        for &(x, y, v) in cells {
            b.push_value(x, y, 0, v, 1.0);
        }
        let msg = b.finish();
        std::fs::create_dir_all(driver.input_dir()).unwrap();
        let name = format!("{radar}.Reflectivity.0.{time}.s2");
        let f = File::create(driver.input_dir().join(name)).unwrap();
        msg.write_to(BufWriter::new(f)).unwrap();
    }

    #[test]
    fn ingest_tick_absorbs_and_deletes_messages() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = Stage2Driver::new(test_config(dir.path()));
        write_message(&driver, "KTLX", 1_000, &[(0, 0, 25.0)]);

        let stats = driver.ingest_tick(1_000).unwrap();
        assert_eq!(stats.messages_ingested, 1);
        assert_eq!(stats.new_values, 1);
        assert_eq!(driver.source_count(), 1);

        let remaining: Vec<_> = std::fs::read_dir(driver.input_dir()).unwrap().collect();
        assert!(remaining.is_empty());
    }

    #[test]
    fn messages_for_another_moment_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = Stage2Driver::new(test_config(dir.path()));
        let mut b = Stage2MessageBuilder::new("KTLX", "Velocity", 1_000, 0, 0, 4, 4, 1);
        b.push_value(0, 0, 0, 10.0, 1.0);
        let msg = b.finish();
        std::fs::create_dir_all(driver.input_dir()).unwrap();
        let f = File::create(driver.input_dir().join("KTLX.Velocity.0.1000.s2")).unwrap();
        msg.write_to(BufWriter::new(f)).unwrap();

        let stats = driver.ingest_tick(1_000).unwrap();
        assert_eq!(stats.messages_ingested, 0);
        assert_eq!(stats.messages_skipped, 1);
    }

    #[test]
    fn finalize_tick_writes_one_layer_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = Stage2Driver::new(test_config(dir.path()));
        write_message(&driver, "KTLX", 1_000, &[(0, 0, 25.0)]);
        driver.ingest_tick(1_000).unwrap();

        let stats = driver.finalize_tick(1_000).unwrap();
        assert_eq!(stats.layers_written, 1);
        let out_dir = driver.output_dir();
        let files: Vec<_> = std::fs::read_dir(&out_dir).unwrap().collect();
        assert_eq!(files.len(), 1);

        let f = File::open(out_dir.join("Reflectivity.0.0.1000.mg")).unwrap();
        let merged = MergedGridFile::read_from(f).unwrap();
        let grid = merged.to_grid();
        assert_eq!(grid.value(0, 0), 25.0);
    }

    #[test]
    fn time_purge_drops_observations_past_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = Stage2Driver::new(test_config(dir.path()));
        write_message(&driver, "KTLX", 1_000, &[(0, 0, 25.0)]);
        driver.ingest_tick(1_000).unwrap();

        let dropped = driver.time_purge(1_000 + driver.config.purge_window_secs + 1);
        assert_eq!(dropped, 1);
    }
}
