//! The reassembly engine: on each tick, absorb every per-partition `.mg`
//! layer stage2 has written for this process's moment, feed it through
//! `TileJoin`, and write out each full-grid composite once it completes
//! (or is flushed early by the history window).

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use fusion_cache::grid_fingerprint;
use fusion_common::error::{io_error, FusionResult};
use fusion_common::time::EpochSeconds;
use fusion_partition::TileJoin;
use fusion_stage2::MergedGridFile;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    pub tiles_ingested: u64,
    pub tiles_skipped: u64,
    pub composites_written: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpireStats {
    pub composites_flushed: u64,
}

/// One heartbeat's combined outcome: ingest and expire.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickStats {
    pub tiles_ingested: u64,
    pub tiles_skipped: u64,
    pub composites_written: u64,
    pub composites_flushed: u64,
    pub pending_keys: usize,
}

pub struct TileJoinDriver {
    config: Config,
    fingerprint: u64,
    joins: HashMap<u32, TileJoin>,
}

impl TileJoinDriver {
    pub fn new(config: Config) -> Self {
        let fingerprint = grid_fingerprint(&config.global_area);
        Self {
            config,
            fingerprint,
            joins: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pending_keys(&self) -> usize {
        self.joins.values().map(|j| j.pending_keys()).sum()
    }

    fn input_dir(&self) -> PathBuf {
        Path::new(&self.config.roster_dir)
            .parent()
            .map(|p| p.join("stage2_out"))
            .unwrap_or_else(|| PathBuf::from("stage2_out"))
            .join(format!("GRID_{:016x}", self.fingerprint))
    }

    fn output_dir(&self) -> PathBuf {
        Path::new(&self.config.roster_dir)
            .parent()
            .map(|p| p.join("merged_out"))
            .unwrap_or_else(|| PathBuf::from("merged_out"))
            .join(format!("GRID_{:016x}", self.fingerprint))
    }

    fn join_for(&mut self, z: u32) -> &mut TileJoin {
        let area = self.config.global_area.clone();
        let partitions = self.config.partitions;
        let window = self.config.history_window_secs;
        self.joins
            .entry(z)
            .or_insert_with(|| TileJoin::new(area, partitions, window))
    }

    fn write_composite(&self, z: u32, moment: &str, subtype: &str, time: EpochSeconds, grid: &fusion_datatypes::LatLonGrid) -> FusionResult<()> {
        let out_dir = self.output_dir();
        std::fs::create_dir_all(&out_dir).map_err(|e| io_error(out_dir.display().to_string(), e))?;

        let merged = MergedGridFile::from_grid(moment, subtype, time, grid);
        let name = format!("{moment}.{z}.{time}.mg");
        let tmp = out_dir.join(format!("{name}.tmp"));
        let finalp = out_dir.join(&name);
        {
            let f = File::create(&tmp).map_err(|e| io_error(tmp.display().to_string(), e))?;
            merged.write_to(BufWriter::new(f))?;
        }
        std::fs::rename(&tmp, &finalp).map_err(|e| io_error(finalp.display().to_string(), e))
    }

    /// Absorb every partition's `.mg` file for this process's moment,
    /// deleting each once ingested into its z-level's `TileJoin`.
    pub fn ingest_tick(&mut self, _now: EpochSeconds) -> FusionResult<IngestStats> {
        let dir = self.input_dir();
        std::fs::create_dir_all(&dir).map_err(|e| io_error(dir.display().to_string(), e))?;

        let mut stats = IngestStats::default();
        let mut to_write: Vec<(u32, String, String, EpochSeconds, fusion_datatypes::LatLonGrid)> = Vec::new();

        for entry in WalkDir::new(&dir).min_depth(2).max_depth(2).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("mg") {
                continue;
            }

            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s,
                None => continue,
            };
            let parts: Vec<&str> = stem.split('.').collect();
            if parts.len() != 4 || parts[0] != self.config.moment {
                stats.tiles_skipped += 1;
                continue;
            }
            let z: u32 = match parts[2].parse() {
                Ok(v) => v,
                Err(_) => {
                    stats.tiles_skipped += 1;
                    continue;
                }
            };

            let file = match File::open(path) {
                Ok(f) => f,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to open tile, skipping");
                    continue;
                }
            };
            let merged = match MergedGridFile::read_from(file) {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read tile, skipping");
                    continue;
                }
            };

            let tile = merged.to_grid();
            let join = self.join_for(z);
            if let Some(composite) = join.ingest(&merged.type_name, &merged.subtype, merged.time, tile) {
                to_write.push((z, merged.type_name.clone(), merged.subtype.clone(), merged.time, composite));
            }
            stats.tiles_ingested += 1;

            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "failed to remove consumed tile");
            }
        }

        for (z, moment, subtype, time, grid) in &to_write {
            self.write_composite(*z, moment, subtype, *time, grid)?;
            stats.composites_written += 1;
        }

        Ok(stats)
    }

    /// Flush every z-level's stale buffered keys, compositing whatever
    /// partitions arrived (an early expiration, logged here).
    pub fn expire_tick(&mut self, now: EpochSeconds) -> FusionResult<ExpireStats> {
        let mut stats = ExpireStats::default();
        let moment = self.config.moment.clone();
        let out_dir = self.output_dir();

        let mut flushed = Vec::new();
        for (z, join) in self.joins.iter_mut() {
            for (key, grid) in join.expire(now) {
                warn!(z, type_name = %key.0, subtype = %key.1, time = key.2, "early tile expiration");
                flushed.push((*z, key, grid));
            }
        }

        if flushed.is_empty() {
            return Ok(stats);
        }

        std::fs::create_dir_all(&out_dir).map_err(|e| io_error(out_dir.display().to_string(), e))?;

        for (z, key, grid) in flushed {
            let merged = MergedGridFile::from_grid(&key.0, &key.1, key.2, &grid);
            let name = format!("{}.{}.{}.mg", moment, z, key.2);
            let tmp = out_dir.join(format!("{name}.tmp"));
            let finalp = out_dir.join(&name);
            let written = File::create(&tmp)
                .map_err(|e| io_error(tmp.display().to_string(), e))
                .and_then(|f| merged.write_to(BufWriter::new(f)))
                .and_then(|_| std::fs::rename(&tmp, &finalp).map_err(|e| io_error(finalp.display().to_string(), e)));
            match written {
                Ok(_) => stats.composites_flushed += 1,
                Err(e) => warn!(error = %e, "failed to write expired composite"),
            }
        }

        Ok(stats)
    }

    /// One heartbeat: absorb new tiles, then flush stale buffered keys.
    pub fn tick(&mut self, now: EpochSeconds) -> FusionResult<TickStats> {
        let ingest = self.ingest_tick(now)?;
        let expire = self.expire_tick(now)?;

        info!(
            tiles_ingested = ingest.tiles_ingested,
            composites_written = ingest.composites_written,
            composites_flushed = expire.composites_flushed,
            "tilejoin tick complete"
        );

        Ok(TickStats {
            tiles_ingested: ingest.tiles_ingested,
            tiles_skipped: ingest.tiles_skipped,
            composites_written: ingest.composites_written,
            composites_flushed: expire.composites_flushed,
            pending_keys: self.pending_keys(),
        })
    }
}
