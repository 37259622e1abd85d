//! Reading incoming radar tilts off disk.
//!
//! GRIB2/NetCDF/polar-radar format readers are out of scope (an
//! external collaborator's job: SPEC_FULL.md §1's `read(URL) ->
//! DataType`); what lands in `--watch-dir` is already a simple
//! per-tilt JSON document this module turns into a `RadialSet`. Files
//! are consumed atomically: a tilt is renamed to `.done` once ingested
//! so a later heartbeat never reprocesses it, mirroring the
//! atomic-rename producer/consumer convention the rest of the pipeline
//! uses for its own `.cache`/`.mask` handoff (SPEC_FULL.md §5).

use std::fs;
use std::path::{Path, PathBuf};

use fusion_common::error::{io_error, FusionResult};
use fusion_common::geo::LLH;
use fusion_datatypes::radial_set::RadialSet;
use serde::Deserialize;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
pub struct IncomingTilt {
    pub radar_name: String,
    pub elevation_deg: f64,
    #[serde(default)]
    pub distance_to_first_gate_m: f64,
    pub azimuths_deg: Vec<f64>,
    #[serde(default)]
    pub beam_widths_deg: Vec<f64>,
    #[serde(default)]
    pub gate_widths_m: Vec<f64>,
    /// `azimuths_deg.len()` rows of per-gate values, native moment units.
    pub values: Vec<Vec<f32>>,
}

impl IncomingTilt {
    pub fn into_radial_set(self, station: LLH) -> RadialSet {
        let num_radials = self.azimuths_deg.len();
        let num_gates = self.values.first().map(|row| row.len()).unwrap_or(0);

        let mut rs = RadialSet::new(
            self.radar_name,
            station,
            self.elevation_deg,
            self.distance_to_first_gate_m,
            num_radials,
            num_gates,
        );

        for (r, az) in self.azimuths_deg.iter().enumerate() {
            rs.set_azimuth_deg(r, *az);
        }
        for (r, bw) in self.beam_widths_deg.iter().enumerate() {
            rs.set_beam_width_deg(r, *bw);
        }
        if !self.gate_widths_m.is_empty() {
            if let Some(gate_width) = rs.grid_mut().float_array_mut("GateWidth") {
                for (r, gw) in self.gate_widths_m.iter().enumerate() {
                    if r < gate_width.len() {
                        gate_width[r] = *gw as f32;
                    }
                }
            }
        }
        for (r, row) in self.values.iter().enumerate() {
            for (g, v) in row.iter().enumerate() {
                rs.set_value(r, g, *v);
            }
        }

        rs
    }
}

/// Walk `dir` for `*.json` tilt files naming `radar_name`, returning
/// each parsed tilt alongside the path it came from so the caller can
/// mark it consumed once ingested. Unreadable or malformed files are
/// logged and skipped rather than aborting the scan.
pub fn scan_watch_dir(dir: &str, radar_name: &str) -> Vec<(PathBuf, IncomingTilt)> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read tilt file, skipping");
                continue;
            }
        };
        match serde_json::from_slice::<IncomingTilt>(&bytes) {
            Ok(tilt) if tilt.radar_name == radar_name => found.push((path.to_path_buf(), tilt)),
            Ok(other) => warn!(
                path = %path.display(),
                got = %other.radar_name,
                expected = %radar_name,
                "tilt file radar mismatch, skipping"
            ),
            Err(e) => warn!(path = %path.display(), error = %e, "unreadable tilt file, skipping"),
        }
    }
    found
}

/// Rename a consumed tilt file so the next scan never sees it again.
pub fn mark_consumed(path: &Path) -> FusionResult<()> {
    let mut done = path.to_path_buf();
    done.set_extension("json.done");
    fs::rename(path, &done).map_err(|e| io_error(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tilt(dir: &Path, name: &str, radar: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"radar_name":"{radar}","elevation_deg":0.5,"distance_to_first_gate_m":1000.0,
                "azimuths_deg":[0.0,90.0],"values":[[1.0,2.0],[3.0,4.0]]}}"#
        )
        .unwrap();
        path
    }

    #[test]
    fn scan_picks_up_only_matching_radar_tilts() {
        let dir = tempfile::tempdir().unwrap();
        write_tilt(dir.path(), "ktlx.json", "KTLX");
        write_tilt(dir.path(), "kfws.json", "KFWS");

        let found = scan_watch_dir(dir.path().to_str().unwrap(), "KTLX");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.radar_name, "KTLX");
    }

    #[test]
    fn into_radial_set_carries_azimuths_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tilt(dir.path(), "ktlx.json", "KTLX");
        let bytes = fs::read(&path).unwrap();
        let tilt: IncomingTilt = serde_json::from_slice(&bytes).unwrap();
        let rs = tilt.into_radial_set(LLH::new(35.33, -97.27, 417.0));
        assert_eq!(rs.num_radials(), 2);
        assert_eq!(rs.num_gates(), 2);
        assert_eq!(rs.azimuth_deg(1), 90.0);
        assert_eq!(rs.value(1, 0), 3.0);
    }

    #[test]
    fn mark_consumed_renames_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tilt(dir.path(), "ktlx.json", "KTLX");
        mark_consumed(&path).unwrap();
        assert!(!path.exists());
        assert!(dir.path().join("ktlx.json.done").exists());
    }
}
