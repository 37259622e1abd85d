//! How the output grid is split across Stage 1 worker processes: either
//! not at all (`None`, one process owns the whole grid) or into a
//! rectangular `Tile` grid, each cell routed to exactly one partition
//! by closed-form arithmetic matching `LLCoverageArea::tile`'s own
//! remainder distribution, so routing never needs the materialized
//! tile list to be fast.

use fusion_common::coverage::LLCoverageArea;
use fusion_common::error::{FusionError, FusionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionInfo {
    None,
    Tile { tiles_x: usize, tiles_y: usize },
}

impl PartitionInfo {
    pub fn num_partitions(&self) -> usize {
        match self {
            PartitionInfo::None => 1,
            PartitionInfo::Tile { tiles_x, tiles_y } => tiles_x * tiles_y,
        }
    }

    /// Materialize the tile sub-areas for `area`, one per partition, in
    /// row-major (tile_y, tile_x) order.
    pub fn tile_areas(&self, area: &LLCoverageArea) -> FusionResult<Vec<LLCoverageArea>> {
        match self {
            PartitionInfo::None => Ok(vec![area.clone()]),
            PartitionInfo::Tile { tiles_x, tiles_y } => area.tile(*tiles_x, *tiles_y),
        }
    }

    /// The `(tile_col, tile_row)` a global cell `(x, y)` routes to,
    /// using the same base-size/remainder split `LLCoverageArea::tile`
    /// uses, without materializing any tile.
    pub fn route(&self, area: &LLCoverageArea, x: usize, y: usize) -> FusionResult<(usize, usize)> {
        match self {
            PartitionInfo::None => Ok((0, 0)),
            PartitionInfo::Tile { tiles_x, tiles_y } => {
                if x >= area.num_x || y >= area.num_y {
                    return Err(FusionError::CoordinateOutOfRange {
                        x: x as i64,
                        y: y as i64,
                        z: 0,
                    });
                }
                let col = column_for(area.num_x, *tiles_x, x);
                let row = column_for(area.num_y, *tiles_y, y);
                Ok((col, row))
            }
        }
    }

    pub fn partition_index(&self, area: &LLCoverageArea, x: usize, y: usize) -> FusionResult<usize> {
        let (col, row) = self.route(area, x, y)?;
        let tiles_x = match self {
            PartitionInfo::None => 1,
            PartitionInfo::Tile { tiles_x, .. } => *tiles_x,
        };
        Ok(row * tiles_x + col)
    }
}

/// Which tile index along one axis a coordinate falls into, given that
/// axis has `total` cells split into `parts` tiles with the first
/// `total % parts` tiles one cell wider than the rest (the same
/// distribution `LLCoverageArea::tile` applies per row/column).
fn column_for(total: usize, parts: usize, coord: usize) -> usize {
    let base = total / parts;
    let remainder = total % parts;
    let wide_span = remainder * (base + 1);
    if coord < wide_span {
        coord / (base + 1)
    } else {
        remainder + (coord - wide_span) / base.max(1)
    }
}
