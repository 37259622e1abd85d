//! Roster's CLI surface and the resolved configuration it boils down to.
//!
//! The grid-language/legacy-t-b-s flags are shared verbatim with stage1's
//! copy (see that crate's `config.rs` doc comment) rather than pulled from
//! a shared CLI crate for four fields.

use std::collections::HashMap;

use clap::Parser;
use fusion_common::coverage::LLCoverageArea;
use fusion_common::error::{FusionError, FusionResult};

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

#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(about = "Nearest-N coverage mask coordinator for the fusion pipeline")]
pub struct Args {
    #[command(flatten)]
    pub grid: GridArgs,

    /// Root of the cache directory tree: `<roster>/GRID_<fingerprint>/{active,mask}`.
    #[arg(long)]
    pub roster: Option<String>,

    /// Number of nearest sources to keep per cell (1..6).
    #[arg(long, default_value_t = 3)]
    pub nearest: u32,

    /// Never age out a `.cache` file by its history window; a source is
    /// dropped only when its `.cache` file disappears entirely.
    #[arg(long = "static")]
    pub static_mode: bool,

    /// Sync schedule, standard six-field cron form with a leading seconds
    /// column ("sec min hr dom mo dow"). Default: the top of every minute.
    #[arg(long, default_value = "0 * * * * *")]
    pub sync: String,

    /// `.cache` files older than this are treated as stale and skipped,
    /// unless `--static` is set.
    #[arg(long, default_value_t = 900)]
    pub history_window_secs: i64,

    /// HTTP port for the health/status/metrics surface.
    #[arg(short, long, default_value_t = 8091)]
    pub port: u16,

    /// Log level.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// The fully-resolved, validated configuration the driver runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub global_area: LLCoverageArea,
    pub roster_dir: String,
    pub nearest: usize,
    pub static_mode: bool,
    pub sync_expr: String,
    pub history_window_secs: i64,
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

        if !(1..=6).contains(&self.nearest) {
            return Err(FusionError::InvalidGridSpec(format!(
                "nearest {} out of range [1, 6]",
                self.nearest
            )));
        }

        Ok(Config {
            global_area,
            roster_dir,
            nearest: self.nearest as usize,
            static_mode: self.static_mode,
            sync_expr: self.sync.clone(),
            history_window_secs: self.history_window_secs,
        })
    }
}

/// Split a `-resolver key[,params]`-style argument, kept here only for
/// parity with stage1's CLI surface in case a future roster flag needs it.
#[allow(dead_code)]
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_out_of_range_is_rejected() {
        let args = Args {
            grid: GridArgs {
                grid: Some("nw(55,-130) se(20,-60) s(0.01,0.01)".to_string()),
                legacy_t: None,
                legacy_b: None,
                legacy_s: None,
            },
            roster: Some("/tmp/roster".to_string()),
            nearest: 7,
            static_mode: false,
            sync: "0 * * * * *".to_string(),
            history_window_secs: 900,
            port: 8091,
            log_level: "info".to_string(),
        };
        assert!(args.resolve().is_err());
    }
}
