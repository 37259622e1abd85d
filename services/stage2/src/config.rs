//! Stage 2's CLI surface and the resolved configuration it boils down to.
//!
//! The grid-language/legacy-t-b-s flags are shared verbatim with stage1's
//! copy (see that crate's `config.rs` doc comment) rather than pulled from
//! a shared CLI crate for four fields.

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
#[command(name = "stage2")]
#[command(about = "Sparse point-cloud merge engine for one grid partition")]
pub struct Args {
    #[command(flatten)]
    pub grid: GridArgs,

    /// Roster directory root (defaults to `$HOME/roster`); stage2's
    /// input/output directories are derived as siblings of it, the same
    /// way stage1 derives `stage2_output_dir()`.
    #[arg(long)]
    pub roster: Option<String>,

    /// Moment this process merges (e.g. "Reflectivity"); a process only
    /// ingests `.s2` messages carrying this moment.
    #[arg(long, default_value = "Reflectivity")]
    pub moment: String,

    /// Product subtype tag stamped onto merged output files and used by
    /// TileJoin's key (e.g. an elevation angle); opaque to this process.
    #[arg(long, default_value = "")]
    pub subtype: String,

    /// Tile the output grid into `x,y` partitions (e.g. "4,3"), matching
    /// the tiling stage1 routed its output into. Omit for a single,
    /// untiled partition.
    #[arg(long)]
    pub tiles: Option<String>,

    /// Which partition (0-based, row-major) this process instance owns.
    #[arg(long, default_value_t = 0)]
    pub partition: usize,

    /// A cell without a touch this long is reported `DataUnavailable`
    /// rather than restored from an older observation.
    #[arg(long, default_value_t = 300)]
    pub observation_window_secs: i64,

    /// Observations older than this are dropped outright by the periodic
    /// time purge, regardless of per-cell restore eligibility.
    #[arg(long, default_value_t = 1800)]
    pub purge_window_secs: i64,

    /// Sync schedule, standard six-field cron form with a leading seconds
    /// column ("sec min hr dom mo dow"). Default: the top of every minute.
    #[arg(long, default_value = "0 * * * * *")]
    pub sync: String,

    /// HTTP port for the health/status/metrics surface.
    #[arg(short, long, default_value_t = 8092)]
    pub port: u16,

    /// Log level.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// The fully-resolved, validated configuration the driver runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub global_area: LLCoverageArea,
    pub partition_area: LLCoverageArea,
    pub partitions: PartitionInfo,
    pub partition_index: usize,
    pub roster_dir: String,
    pub moment: String,
    pub subtype: String,
    pub observation_window_secs: i64,
    pub purge_window_secs: i64,
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

        if self.partition >= partitions.num_partitions() {
            return Err(FusionError::InvalidGridSpec(format!(
                "partition {} out of range for {} partition(s)",
                self.partition,
                partitions.num_partitions()
            )));
        }

        let partition_area = partitions.tile_areas(&global_area)?[self.partition].clone();

        Ok(Config {
            global_area,
            partition_area,
            partitions,
            partition_index: self.partition,
            roster_dir,
            moment: self.moment.clone(),
            subtype: self.subtype.clone(),
            observation_window_secs: self.observation_window_secs,
            purge_window_secs: self.purge_window_secs,
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
            subtype: String::new(),
            tiles: None,
            partition: 0,
            observation_window_secs: 300,
            purge_window_secs: 1800,
            sync: "0 * * * * *".to_string(),
            port: 8092,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn untiled_config_owns_the_whole_grid() {
        let config = base_args().resolve().unwrap();
        assert_eq!(config.partitions, PartitionInfo::None);
        assert_eq!(config.partition_area.num_x, config.global_area.num_x);
    }

    #[test]
    fn out_of_range_partition_is_rejected() {
        let mut args = base_args();
        args.tiles = Some("2,2".to_string());
        args.partition = 4;
        assert!(args.resolve().is_err());
    }
}
