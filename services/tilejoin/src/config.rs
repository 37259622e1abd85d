//! TileJoin's CLI surface and the resolved configuration it boils down
//! to. The grid-language flags are shared verbatim with stage1/stage2's
//! copies (see `stage2::config`'s doc comment).

use clap::Parser;
use fusion_common::coverage::LLCoverageArea;
use fusion_common::error::{FusionError, FusionResult};
use fusion_partition::PartitionInfo;

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
#[command(name = "tilejoin")]
#[command(about = "Reassembles per-partition stage2 tiles into full-grid output")]
pub struct Args {
    #[command(flatten)]
    pub grid: GridArgs,

    /// Roster directory root (defaults to `$HOME/roster`); tilejoin's
    /// input (`stage2_out`) and output (`merged_out`) directories are
    /// derived as siblings of it, matching stage2's own derivation.
    #[arg(long)]
    pub roster: Option<String>,

    /// Moment this process joins (e.g. "Reflectivity"); a process only
    /// considers stage2 output files carrying this moment.
    #[arg(long, default_value = "Reflectivity")]
    pub moment: String,

    /// How stage2's output was tiled, `x,y` (e.g. "4,3"). Must match the
    /// tiling every stage2 partition process was started with.
    #[arg(long)]
    pub tiles: Option<String>,

    /// A buffered key (type/subtype/time) older than this is flushed
    /// and composited from whatever partitions have arrived, logged as
    /// an early expiration.
    #[arg(long, default_value_t = 300)]
    pub history_window_secs: i64,

    /// Sync schedule, standard six-field cron form with a leading
    /// seconds column ("sec min hr dom mo dow").
    #[arg(long, default_value = "0 * * * * *")]
    pub sync: String,

    /// HTTP port for the health/status/metrics surface.
    #[arg(short, long, default_value_t = 8093)]
    pub port: u16,

    /// Log level.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// The fully-resolved, validated configuration the driver runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub global_area: LLCoverageArea,
    pub partitions: PartitionInfo,
    pub roster_dir: String,
    pub moment: String,
    pub history_window_secs: i64,
    pub sync_expr: String,
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

        let partitions = match &self.tiles {
            Some(spec) => {
                let (x, y) = spec.split_once(',').ok_or_else(|| {
                    FusionError::InvalidGridSpec(format!("expected 'x,y' tiling, got '{spec}'"))
                })?;
                let tiles_x: usize = x
                    .trim()
                    .parse()
                    .map_err(|_| FusionError::InvalidGridSpec(format!("not a number: '{x}'")))?;
                let tiles_y: usize = y
                    .trim()
                    .parse()
                    .map_err(|_| FusionError::InvalidGridSpec(format!("not a number: '{y}'")))?;
                PartitionInfo::Tile { tiles_x, tiles_y }
            }
            None => PartitionInfo::None,
        };

        Ok(Config {
            global_area,
            partitions,
            roster_dir,
            moment: self.moment.clone(),
            history_window_secs: self.history_window_secs,
            sync_expr: self.sync.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            grid: GridArgs {
                grid: Some("nw(55,-130) se(20,-60) s(1.0,1.0)".to_string()),
                legacy_t: None,
                legacy_b: None,
                legacy_s: None,
            },
            roster: Some("/tmp/roster".to_string()),
            moment: "Reflectivity".to_string(),
            tiles: Some("2,2".to_string()),
            history_window_secs: 300,
            sync: "0 * * * * *".to_string(),
            port: 8093,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn resolves_a_tiled_config() {
        let config = base_args().resolve().unwrap();
        assert_eq!(config.partitions, PartitionInfo::Tile { tiles_x: 2, tiles_y: 2 });
        assert_eq!(config.partitions.num_partitions(), 4);
    }

    #[test]
    fn untiled_config_joins_a_single_partition() {
        let mut args = base_args();
        args.tiles = None;
        let config = args.resolve().unwrap();
        assert_eq!(config.partitions, PartitionInfo::None);
        assert_eq!(config.partitions.num_partitions(), 1);
    }
}
