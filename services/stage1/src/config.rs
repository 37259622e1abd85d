//! Stage 1's CLI surface and the resolved configuration it boils down to.
//!
//! The grid-language/legacy-t-b-s flags are shared verbatim across all
//! four binaries (`stage1`, `roster`, `stage2`, `tilejoin`) per the grid
//! specification surface every one of them accepts; each binary flattens
//! its own copy of `GridArgs` into its `Args` rather than pulling in a
//! shared CLI crate for four fields.

use std::collections::HashMap;

use clap::Parser;
use fusion_common::coverage::LLCoverageArea;
use fusion_common::error::{FusionError, FusionResult};
use fusion_common::geo::LLH;

#[derive(Parser, Debug, Clone)]
pub struct GridArgs {
    /// Modern grid language: `nw(lat,lon) se(lat,lon) s(dlat,dlon) [h(lo,hi,incr)]`.
    #[arg(long)]
    pub grid: Option<String>,

    /// Legacy north-west corner: "lat lon".
    #[arg(long = "t")]
    pub legacy_t: Option<String>,

    /// Legacy south-east corner: "lat lon".
    #[arg(long = "b")]
    pub legacy_b: Option<String>,

    /// Legacy spacing: "dlat dlon".
    #[arg(long = "s")]
    pub legacy_s: Option<String>,
}

impl GridArgs {
    /// Resolve to an `LLCoverageArea`, preferring the modern `--grid`
    /// string and falling back to the legacy `-t`/`-b`/`-s` triple by
    /// translating it into the same grid language before parsing.
    pub fn resolve(&self) -> FusionResult<LLCoverageArea> {
        if let Some(grid) = &self.grid {
            return LLCoverageArea::parse(grid);
        }

        let (t, b, s) = match (&self.legacy_t, &self.legacy_b, &self.legacy_s) {
            (Some(t), Some(b), Some(s)) => (t, b, s),
            _ => {
                return Err(FusionError::InvalidGridSpec(
                    "no grid specified: pass --grid or all of --t/--b/--s".to_string(),
                ))
            }
        };
        let nw = parse_pair(t)?;
        let se = parse_pair(b)?;
        let spacing = parse_pair(s)?;
        let grid = format!(
            "nw({},{}) se({},{}) s({},{})",
            nw.0, nw.1, se.0, se.1, spacing.0, spacing.1
        );
        LLCoverageArea::parse(&grid)
    }
}

fn parse_pair(s: &str) -> FusionResult<(f64, f64)> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(FusionError::InvalidGridSpec(format!(
            "expected 'a b [h]', got '{s}'"
        )));
    }
    let a: f64 = parts[0]
        .parse()
        .map_err(|_| FusionError::InvalidGridSpec(format!("not a number: '{}'", parts[0])))?;
    let b: f64 = parts[1]
        .parse()
        .map_err(|_| FusionError::InvalidGridSpec(format!("not a number: '{}'", parts[1])))?;
    Ok((a, b))
}

/// Split a `-resolver key[,params]`-style argument into the factory key
/// and a `name=value` parameter bag, mirroring how the grid language
/// itself separates a function name from its parenthesized arguments.
pub fn parse_key_params(s: &str) -> (String, HashMap<String, String>) {
    let mut parts = s.splitn(2, ',');
    let key = parts.next().unwrap_or_default().trim().to_string();
    let mut params = HashMap::new();
    if let Some(rest) = parts.next() {
        for kv in rest.split(',') {
            if let Some((k, v)) = kv.split_once('=') {
                params.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
    }
    (key, params)
}

#[derive(Parser, Debug)]
#[command(name = "stage1")]
#[command(about = "Per-radar polar-to-Cartesian projection and resolver pipeline")]
pub struct Args {
    #[command(flatten)]
    pub grid: GridArgs,

    /// Radar identity this process owns (one Stage 1 process per radar).
    #[arg(long)]
    pub radar: String,

    /// Radar antenna latitude, degrees.
    #[arg(long)]
    pub lat: f64,

    /// Radar antenna longitude, degrees.
    #[arg(long)]
    pub lon: f64,

    /// Radar antenna height above sea level, meters.
    #[arg(long, default_value_t = 0.0)]
    pub height_m: f64,

    /// Moment this process projects (e.g. "Reflectivity").
    #[arg(long, default_value = "Reflectivity")]
    pub moment: String,

    /// Maximum usable range from the radar, kilometers (50..1000).
    #[arg(long, default_value_t = 300.0)]
    pub rangekm: f64,

    /// `-resolver key[,params]`: value-resolver factory key and tuning params.
    #[arg(long, default_value = "lak")]
    pub resolver: String,

    /// `-volume key[,params]`: virtual-volume implementation key.
    #[arg(long, default_value = "standard")]
    pub volume: String,

    /// `-terrain key[,params]`: terrain blockage model key. Omit to run
    /// with no terrain correction at all (equivalent to a missing DEM).
    #[arg(long)]
    pub terrain: Option<String>,

    /// DEM file backing the terrain model, required iff `--terrain` is set.
    #[arg(long)]
    pub dem: Option<String>,

    /// Directory watched for incoming serialized tilt files.
    #[arg(long)]
    pub watch_dir: String,

    /// Roster directory root (defaults to `$HOME/roster`).
    #[arg(long)]
    pub roster: Option<String>,

    /// Emit radar-box outputs instead of routing into the full grid's
    /// partitions.
    #[arg(long)]
    pub subgrid: bool,

    /// Emit every Nth frame (1..10).
    #[arg(long, default_value_t = 1)]
    pub throttle: u32,

    /// Accepted for CLI-surface completeness; threaded through to the
    /// resolved configuration and logged once at startup. The smoother
    /// itself is not implemented.
    #[arg(long)]
    pub presmooth: bool,

    /// Write a debug CAPPI file per layer per frame under this directory.
    #[arg(long)]
    pub llg: Option<String>,

    /// Tile the output grid into `x,y` partitions (e.g. "4,3"). Omit for
    /// a single, untiled partition.
    #[arg(long)]
    pub tiles: Option<String>,

    /// Heartbeat period, seconds.
    #[arg(long, default_value_t = 30)]
    pub heartbeat_secs: u64,

    /// History window tilts/volumes age out of, seconds.
    #[arg(long, default_value_t = 900)]
    pub history_window_secs: i64,

    /// HTTP port for the health/status/metrics surface.
    #[arg(short, long, default_value_t = 8090)]
    pub port: u16,

    /// Log level.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// The fully-resolved, validated configuration the driver runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub radar_name: String,
    pub station: LLH,
    pub moment: String,
    pub max_range_km: f64,
    pub resolver_key: String,
    pub resolver_params: HashMap<String, String>,
    pub volume_key: String,
    pub terrain_key: Option<String>,
    pub dem_path: Option<String>,
    pub watch_dir: String,
    pub roster_dir: String,
    pub subgrid: bool,
    pub throttle: u32,
    pub presmooth: bool,
    pub llg_dir: Option<String>,
    pub tiles: Option<(usize, usize)>,
    pub heartbeat_secs: u64,
    pub history_window_secs: i64,
    pub global_area: LLCoverageArea,
}

impl Args {
    pub fn resolve(&self) -> FusionResult<Config> {
        let global_area = self.grid.resolve()?;

        let roster_dir = match &self.roster {
            Some(dir) => dir.clone(),
            None => {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                format!("{home}/roster")
            }
        };

        let tiles = match &self.tiles {
            Some(spec) => {
                let (x, y) = spec.split_once(',').ok_or_else(|| {
                    FusionError::InvalidGridSpec(format!("expected 'x,y' tiling, got '{spec}'"))
                })?;
                let x: usize = x
                    .trim()
                    .parse()
                    .map_err(|_| FusionError::InvalidGridSpec(format!("not a number: '{x}'")))?;
                let y: usize = y
                    .trim()
                    .parse()
                    .map_err(|_| FusionError::InvalidGridSpec(format!("not a number: '{y}'")))?;
                Some((x, y))
            }
            None => None,
        };

        if !(50.0..=1000.0).contains(&self.rangekm) {
            return Err(FusionError::InvalidGridSpec(format!(
                "rangekm {} out of range [50, 1000]",
                self.rangekm
            )));
        }
        if !(1..=10).contains(&self.throttle) {
            return Err(FusionError::InvalidGridSpec(format!(
                "throttle {} out of range [1, 10]",
                self.throttle
            )));
        }
        if self.terrain.is_some() && self.dem.is_none() {
            return Err(FusionError::MissingDem {
                radar: self.radar.clone(),
                path: String::new(),
            });
        }

        let (resolver_key, resolver_params) = parse_key_params(&self.resolver);
        let (volume_key, _) = parse_key_params(&self.volume);
        let terrain_key = self.terrain.as_ref().map(|t| parse_key_params(t).0);

        Ok(Config {
            radar_name: self.radar.clone(),
            station: LLH::new(self.lat, self.lon, self.height_m),
            moment: self.moment.clone(),
            max_range_km: self.rangekm,
            resolver_key,
            resolver_params,
            volume_key,
            terrain_key,
            dem_path: self.dem.clone(),
            watch_dir: self.watch_dir.clone(),
            roster_dir,
            subgrid: self.subgrid,
            throttle: self.throttle,
            presmooth: self.presmooth,
            llg_dir: self.llg.clone(),
            tiles,
            heartbeat_secs: self.heartbeat_secs,
            history_window_secs: self.history_window_secs,
            global_area,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_without_params() {
        let (key, params) = parse_key_params("lak");
        assert_eq!(key, "lak");
        assert!(params.is_empty());
    }

    #[test]
    fn parses_key_with_params() {
        let (key, params) = parse_key_params("lak,variance_weight=0.0002,global_weight=1.0");
        assert_eq!(key, "lak");
        assert_eq!(params.get("variance_weight").unwrap(), "0.0002");
        assert_eq!(params.get("global_weight").unwrap(), "1.0");
    }
}
