//! The per-radar Stage 1 driver: precomputes the projection caches
//! once per radar, then sweeps the radar's inset output grid on every
//! heartbeat per SPEC_FULL.md §4.1 — ingest newly arrived tilts,
//! resolve each cell against its enclosing tilts, and emit masked
//! Stage-2 sparse messages routed to the partitions this radar's
//! coverage touches.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use fusion_cache::{grid_fingerprint, MaskFile, RangeCacheFile};
use fusion_common::constants::{is_good, MISSING_DATA};
use fusion_common::error::{io_error, FusionError, FusionResult};
use fusion_common::time::EpochSeconds;
use fusion_datatypes::radial_set::{RadialSet, RadialSetId};
use fusion_geo::{AzRanElevCache, LevelSameCache, SinCosLatLonCache};
use fusion_partition::PartitionInfo;
use fusion_resolver::{ResolverQuery, TiltSample, VolumeValueResolver};
use fusion_stage2::{Stage2Message, Stage2MessageBuilder};
use fusion_terrain::{calculate_terrain_per_gate, Dem, TerrainBlockage};
use fusion_volume::{VolumeKey, VolumeManager};
use tracing::warn;

use crate::config::Config;
use crate::tilt_source;

#[derive(Debug, Default, Clone, Copy)]
pub struct SweepStats {
    pub cells_written: u64,
    pub range_skipped: u64,
    pub same_tilt_skipped: u64,
    pub masked_skipped: u64,
}

pub struct RadarDriver {
    config: Config,
    volume_key: VolumeKey,
    volume_manager: VolumeManager,
    inset_area: fusion_common::coverage::LLCoverageArea,
    az_cache: AzRanElevCache,
    level_same: Vec<LevelSameCache>,
    last_values: Vec<Vec<f32>>,
    resolver: Box<dyn VolumeValueResolver>,
    terrain: Option<(Box<dyn TerrainBlockage>, Dem)>,
    partition_info: PartitionInfo,
    mask: Option<MaskFile>,
    next_id: RadialSetId,
    fingerprint: u64,
}

impl RadarDriver {
    pub fn new(config: Config) -> FusionResult<Self> {
        let station = config.station;
        let inset_area = config
            .global_area
            .inset_radar_range(station.latitude_deg, station.longitude_deg, config.max_range_km);

        let sincos = SinCosLatLonCache::new(
            inset_area.nw_lat_deg,
            inset_area.nw_lon_deg,
            inset_area.lat_spacing_deg,
            inset_area.lon_spacing_deg,
            inset_area.num_y,
            inset_area.num_x,
        );
        let az_cache = AzRanElevCache::build(config.radar_name.clone(), station, &sincos);

        let num_z = inset_area.num_z();
        let level_same = (0..num_z)
            .map(|_| LevelSameCache::new(inset_area.num_y, inset_area.num_x))
            .collect();
        let last_values = (0..num_z)
            .map(|_| vec![fusion_common::constants::DATA_UNAVAILABLE; inset_area.num_y * inset_area.num_x])
            .collect();

        let resolver = fusion_resolver::build_resolver(&config.resolver_key)?;

        let terrain = match (&config.terrain_key, &config.dem_path) {
            (Some(key), Some(path)) => {
                let model = fusion_terrain::build_model(key)
                    .map_err(|e| FusionError::UnknownTerrainModel(e.to_string()))?;
                let dem = crate::dem::load_dem(path)?;
                Some((model, dem))
            }
            _ => None,
        };

        let partition_info = match config.tiles {
            Some((tiles_x, tiles_y)) => PartitionInfo::Tile { tiles_x, tiles_y },
            None => PartitionInfo::None,
        };

        let fingerprint = grid_fingerprint(&config.global_area);
        let volume_key = VolumeKey::new(config.radar_name.clone(), config.moment.clone());

        Ok(Self {
            config,
            volume_key,
            volume_manager: VolumeManager::new(),
            inset_area,
            az_cache,
            level_same,
            last_values,
            resolver,
            terrain,
            partition_info,
            mask: None,
            next_id: 0,
            fingerprint,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn next_radial_set_id(&mut self) -> RadialSetId {
        self.next_id = self.next_id.wrapping_add(1);
        if self.next_id == 0 {
            self.next_id = 1;
        }
        self.next_id
    }

    fn mask_dir(&self) -> PathBuf {
        Path::new(&self.config.roster_dir).join(format!("GRID_{}", self.fingerprint)).join("mask")
    }

    fn cache_dir(&self) -> PathBuf {
        Path::new(&self.config.roster_dir).join(format!("GRID_{}", self.fingerprint)).join("active")
    }

    /// The directory Stage 2 watches for this radar's sparse messages.
    /// `config.rs`'s CLI surface has no dedicated output-directory flag
    /// (see DESIGN.md), so this is derived as a sibling of the roster
    /// directory rather than taken from a flag.
    pub fn stage2_output_dir(&self) -> PathBuf {
        let base = Path::new(&self.config.roster_dir)
            .parent()
            .map(|p| p.join("stage2_in"))
            .unwrap_or_else(|| PathBuf::from("stage2_in"));
        base.join(format!("GRID_{}", self.fingerprint))
    }

    /// Reload this radar's nearest-N mask from Roster's last write.
    /// Missing or corrupt mask files are tolerated: the previous mask
    /// (or `None`, meaning unmasked) is kept until the next tick.
    pub fn reload_mask(&mut self) {
        let path = self.mask_dir().join(format!("{}.mask", self.config.radar_name));
        match fs::File::open(&path) {
            Ok(f) => match MaskFile::read_from(std::io::BufReader::new(f)) {
                Ok(m) => self.mask = Some(m),
                Err(e) => warn!(path = %path.display(), error = %e, "corrupt mask file, keeping previous mask"),
            },
            Err(_) => {}
        }
    }

    fn mask_bit(&self, x: usize, y: usize, z: usize) -> bool {
        match &self.mask {
            Some(m) => m.mask.is_set1(m.mask.index_3d(x, y, z)),
            None => true,
        }
    }

    /// Write this radar's `.cache` range file. The geometry it encodes
    /// is fixed for the life of the process, so this only needs to run
    /// once at startup.
    pub fn write_range_cache(&self) -> FusionResult<()> {
        let num_x = self.inset_area.num_x;
        let num_y = self.inset_area.num_y;
        let num_z = self.inset_area.num_z();
        let mut ranges_km = vec![0f32; num_x * num_y * num_z];
        for z in 0..num_z {
            for y in 0..num_y {
                for x in 0..num_x {
                    let i = z * num_y * num_x + y * num_x + x;
                    ranges_km[i] = self.az_cache.ground_range_km(y, x) as f32;
                }
            }
        }

        let file = RangeCacheFile {
            radar_name: self.config.radar_name.clone(),
            fingerprint: self.fingerprint,
            start_x: self.inset_area.start_x as u32,
            start_y: self.inset_area.start_y as u32,
            num_x: num_x as u32,
            num_y: num_y as u32,
            num_z: num_z as u32,
            ranges_km,
        };

        let dir = self.cache_dir();
        fs::create_dir_all(&dir).map_err(|e| io_error(dir.display().to_string(), e))?;
        let final_path = dir.join(format!("{}.cache", self.config.radar_name));
        let tmp_path = dir.join(format!("{}.cache.tmp", self.config.radar_name));
        let mut buf = Vec::new();
        file.write_to(&mut buf)?;
        fs::write(&tmp_path, &buf).map_err(|e| io_error(tmp_path.display().to_string(), e))?;
        fs::rename(&tmp_path, &final_path).map_err(|e| io_error(final_path.display().to_string(), e))?;
        Ok(())
    }

    /// Scan `watch_dir` for new tilts, convert and terrain-correct each
    /// one, ingest it into the volume manager, and sweep out tilts
    /// older than the history window. Returns (ingested, rejected).
    pub fn ingest_tilts(&mut self, now: EpochSeconds) -> (u64, u64) {
        let found = tilt_source::scan_watch_dir(&self.config.watch_dir, &self.config.radar_name);
        let mut ingested = 0u64;
        let mut rejected = 0u64;

        for (path, tilt) in found {
            if tilt.radar_name != self.config.radar_name {
                rejected += 1;
                continue;
            }
            let mut rs = tilt.into_radial_set(self.config.station);
            rs.id = self.next_radial_set_id();

            if let Some((model, dem)) = &mut self.terrain {
                rs.ensure_terrain_arrays();
                calculate_terrain_per_gate(model.as_mut(), dem, &mut rs);
            }

            self.volume_manager.ingest(self.config.moment.clone(), rs, now);
            if let Err(e) = tilt_source::mark_consumed(&path) {
                warn!(path = %path.display(), error = %e, "failed to mark tilt consumed");
            }
            ingested += 1;
        }

        self.volume_manager
            .sweep_expired(now - self.config.history_window_secs);

        (ingested, rejected)
    }

    /// Sweep every cell of this radar's inset output grid once, per
    /// SPEC_FULL.md §4.1's six-step per-frame algorithm. Returns sweep
    /// statistics plus one `Stage2Message` per partition this radar's
    /// coverage touched this tick.
    pub fn sweep(&mut self, now: EpochSeconds) -> (SweepStats, HashMap<usize, Stage2Message>) {
        let mut stats = SweepStats::default();
        let mut builders: HashMap<usize, Stage2MessageBuilder> = HashMap::new();

        let num_x = self.inset_area.num_x;
        let num_y = self.inset_area.num_y;
        let num_z = self.inset_area.num_z();

        for z in 0..num_z {
            let height_km = self.inset_area.heights_km[z];
            for y in 0..num_y {
                for x in 0..num_x {
                    let ground_km = self.az_cache.ground_range_km(y, x);
                    if ground_km > self.config.max_range_km {
                        stats.range_skipped += 1;
                        continue;
                    }

                    let (virt_elev_deg, virt_range_km) =
                        self.az_cache.virtual_elevation_range_km(y, x, height_km);
                    let enclosing = self.volume_manager.query_enclosing(&self.volume_key, virt_elev_deg);

                    let lower_id = enclosing.lower.map(|t| t.id).unwrap_or(0);
                    let upper_id = enclosing.upper.map(|t| t.id).unwrap_or(0);
                    let lower2_id = enclosing.second_lower.map(|t| t.id).unwrap_or(0);
                    let upper2_id = enclosing.second_upper.map(|t| t.id).unwrap_or(0);
                    if self.level_same[z].check_and_update(y, x, lower_id, upper_id, lower2_id, upper2_id) {
                        stats.same_tilt_skipped += 1;
                        continue;
                    }

                    let mask_hit = self.mask_bit(x, y, z);
                    let az_cache = &self.az_cache;
                    let sample = |tilt: Option<&RadialSet>| -> Option<TiltSample> {
                        let t = tilt?;
                        let az_deg = az_cache.azimuth_deg(y, x);
                        let range_km =
                            az_cache.slant_range_km(y, x, t.elevation_tan(), t.elevation_cos(), height_km);
                        let (radial, gate) = t.sample_at(az_deg, range_km)?;
                        Some(TiltSample {
                            value: t.value(radial, gate),
                            elevation_deg: t.elevation_deg,
                            terrain_cbb: if t.has_terrain() { t.terrain_cbb(radial, gate) } else { 0.0 },
                            beam_bottom_hit: t.beam_bottom_hit(radial, gate),
                            azimuth_deg: az_deg,
                            range_km,
                            mask: mask_hit,
                        })
                    };

                    let query = ResolverQuery {
                        lower: sample(enclosing.lower),
                        upper: sample(enclosing.upper),
                        second_lower: sample(enclosing.second_lower),
                        second_upper: sample(enclosing.second_upper),
                        target_elev_deg: virt_elev_deg,
                        virtual_range_km: virt_range_km,
                        global_weight: 1.0,
                        variance_weight: 0.00005,
                    };

                    let output = self.resolver.calc(&query);
                    let resolved = output.resolved_value();

                    let idx = y * num_x + x;
                    if self.last_values[z][idx] == resolved {
                        continue;
                    }
                    self.last_values[z][idx] = resolved;

                    if !mask_hit {
                        stats.masked_skipped += 1;
                        continue;
                    }

                    if resolved != MISSING_DATA && !is_good(resolved) {
                        continue;
                    }

                    let global_x = self.inset_area.start_x + x;
                    let global_y = self.inset_area.start_y + y;
                    let partition_idx = match self
                        .partition_info
                        .partition_index(&self.config.global_area, global_x, global_y)
                    {
                        Ok(i) => i,
                        Err(e) => {
                            warn!(error = %e, x = global_x, y = global_y, "cell routes to no partition, dropping");
                            continue;
                        }
                    };

                    let radar_name = self.config.radar_name.clone();
                    let moment = self.config.moment.clone();
                    let builder = builders.entry(partition_idx).or_insert_with(|| {
                        Stage2MessageBuilder::new(
                            radar_name,
                            moment,
                            now,
                            self.inset_area.start_x as u32,
                            self.inset_area.start_y as u32,
                            num_x as u32,
                            num_y as u32,
                            num_z as u32,
                        )
                    });

                    if resolved == MISSING_DATA {
                        builder.push_missing(x as u32, y as u32, z as u32);
                    } else {
                        builder.push_value(x as u32, y as u32, z as u32, resolved, output.weight as f32);
                        stats.cells_written += 1;
                    }
                }
            }
        }

        let messages = builders.into_iter().map(|(k, b)| (k, b.finish())).collect();
        (stats, messages)
    }

    pub fn should_emit(&self, frame: u64) -> bool {
        frame % self.config.throttle as u64 == 0
    }

    /// Atomically write each partition's message into `out_dir`.
    pub fn write_stage2_messages(
        &self,
        messages: &HashMap<usize, Stage2Message>,
        out_dir: &Path,
        frame_time: EpochSeconds,
    ) -> FusionResult<usize> {
        fs::create_dir_all(out_dir).map_err(|e| io_error(out_dir.display().to_string(), e))?;
        let mut written = 0;
        for (partition_idx, msg) in messages {
            let mut buf = Vec::new();
            msg.write_to(&mut buf)?;
            let name = format!(
                "{}.{}.{}.{}.s2",
                self.config.radar_name, self.config.moment, partition_idx, frame_time
            );
            let tmp = out_dir.join(format!("{name}.tmp"));
            let finalp = out_dir.join(name);
            fs::write(&tmp, &buf).map_err(|e| io_error(tmp.display().to_string(), e))?;
            fs::rename(&tmp, &finalp).map_err(|e| io_error(finalp.display().to_string(), e))?;
            written += 1;
        }
        Ok(written)
    }
}
