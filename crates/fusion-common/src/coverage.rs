//! `LLCoverageArea`: the lat/lon grid description shared by every stage,
//! plus the small grid-language parser used to read it off a CLI flag.
//!
//! Grid language is `function(params) function(params) ...`, e.g.
//! `nw(55,-130) se(20,-60) s(0.01,0.01) h(0,20,1km)`. Unknown functions or
//! missing required corners are configuration errors (fatal at startup).

use crate::error::{FusionError, FusionResult};
use crate::geo::LL;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A rectangular lat/lon grid: corners, spacing, dimensions, and the list
/// of height layers (in km) it covers. `start_x`/`start_y` let a tile
/// describe its offset within a larger parent grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LLCoverageArea {
    pub nw_lat_deg: f64,
    pub nw_lon_deg: f64,
    pub se_lat_deg: f64,
    pub se_lon_deg: f64,
    pub lat_spacing_deg: f64,
    pub lon_spacing_deg: f64,
    pub start_x: usize,
    pub start_y: usize,
    pub num_x: usize,
    pub num_y: usize,
    pub heights_km: Vec<f64>,
    pub lat_km_per_pixel: f64,
    pub lon_km_per_pixel: f64,
    height_parse: String,
}

impl Default for LLCoverageArea {
    fn default() -> Self {
        Self {
            nw_lat_deg: 55.0,
            nw_lon_deg: -130.0,
            se_lat_deg: 20.0,
            se_lon_deg: -60.0,
            lat_spacing_deg: 0.01,
            lon_spacing_deg: 0.01,
            start_x: 0,
            start_y: 0,
            num_x: 0,
            num_y: 0,
            heights_km: vec![0.0],
            lat_km_per_pixel: 0.0,
            lon_km_per_pixel: 0.0,
            height_parse: String::new(),
        }
    }
}

impl LLCoverageArea {
    pub fn num_z(&self) -> usize {
        self.heights_km.len()
    }

    /// Set the grid corners/spacing/dimensions directly, swapping corners
    /// that were given backwards, and recompute the per-pixel km scale.
    pub fn set(
        &mut self,
        mut north: f64,
        mut west: f64,
        mut south: f64,
        mut east: f64,
        lat_spacing: f64,
        lon_spacing: f64,
        num_x: usize,
        num_y: usize,
    ) {
        if north < south {
            std::mem::swap(&mut north, &mut south);
        }
        if east < west {
            std::mem::swap(&mut east, &mut west);
        }
        self.nw_lat_deg = north;
        self.nw_lon_deg = west;
        self.se_lat_deg = south;
        self.se_lon_deg = east;
        self.lat_spacing_deg = lat_spacing;
        self.lon_spacing_deg = lon_spacing;
        self.start_x = 0;
        self.start_y = 0;
        self.num_x = num_x;
        self.num_y = num_y;
        self.sync();
    }

    /// Recompute `lat_km_per_pixel`/`lon_km_per_pixel` from the midlines of
    /// the current extent.
    pub fn sync(&mut self) {
        let mid_lat = (self.nw_lat_deg - self.se_lat_deg) / 2.0;
        let mid_lon = (self.se_lon_deg - self.nw_lon_deg) / 2.0;
        let mid_top = LL::new(self.nw_lat_deg, mid_lon);
        let mid_bot = LL::new(self.se_lat_deg, mid_lon);
        let left_mid = LL::new(mid_lat, self.nw_lon_deg);
        let right_mid = LL::new(mid_lat, self.se_lon_deg);

        let d1 = mid_top.surface_distance_to_km(&mid_bot);
        let d2 = left_mid.surface_distance_to_km(&right_mid);

        self.lat_km_per_pixel = if self.num_y > 0 {
            (d1 / self.num_y as f64).abs()
        } else {
            0.0
        };
        self.lon_km_per_pixel = if self.num_x > 0 {
            (d2 / self.num_x as f64).abs()
        } else {
            0.0
        };
    }

    /// Shrink this grid to the box around a radar's usable range, keeping
    /// whichever original edges are already tighter than that box.
    pub fn inset_radar_range(&self, center_lat: f64, center_lon: f64, range_km: f64) -> Self {
        use crate::geo::Project;

        let mut out = self.clone();

        let (north, _) = Project::ll_bearing_distance(center_lat, center_lon, 0.0, range_km);
        let (_, east) = Project::ll_bearing_distance(center_lat, center_lon, 90.0, range_km);
        let (south, _) = Project::ll_bearing_distance(center_lat, center_lon, 180.0, range_km);
        let (_, west) = Project::ll_bearing_distance(center_lat, center_lon, 270.0, range_km);

        if self.nw_lat_deg > north {
            let delta_y = ((out.nw_lat_deg - north) / self.lat_spacing_deg).floor() as usize;
            out.start_y += delta_y;
            out.num_y = out.num_y.saturating_sub(delta_y);
            out.nw_lat_deg -= out.start_y as f64 * out.lat_spacing_deg;
        }
        if west > self.nw_lon_deg {
            let delta_x = ((west - out.nw_lon_deg) / self.lon_spacing_deg).floor() as usize;
            out.start_x += delta_x;
            out.num_x = out.num_x.saturating_sub(delta_x);
            out.nw_lon_deg += out.start_x as f64 * out.lon_spacing_deg;
        }
        if south > self.se_lat_deg {
            let delta_y = ((south - out.se_lat_deg) / self.lat_spacing_deg).floor() as usize;
            out.num_y = out.num_y.saturating_sub(delta_y);
            out.se_lat_deg = out.nw_lat_deg - out.num_y as f64 * out.lat_spacing_deg;
        }
        if self.se_lon_deg > east {
            let delta_x = ((out.se_lon_deg - east) / self.lon_spacing_deg).floor() as usize;
            out.num_x = out.num_x.saturating_sub(delta_x);
            out.se_lon_deg = out.nw_lon_deg + out.num_x as f64 * out.lon_spacing_deg;
        }

        out.sync();
        out
    }

    /// Split into `x` by `y` tiles, distributing any rows/columns left
    /// over from uneven division across the first tiles so all cells of
    /// the parent grid are covered exactly once.
    pub fn tile(&self, x: usize, y: usize) -> FusionResult<Vec<LLCoverageArea>> {
        if x < 1 || y < 1 {
            return Err(FusionError::InvalidGridSpec(format!(
                "refusing to tile with x={x} y={y}"
            )));
        }
        if self.num_x / x < 1 || self.num_y / y < 1 {
            return Err(FusionError::InvalidGridSpec(format!(
                "grid {}x{} is smaller than requested tiling {x}x{y}",
                self.num_x, self.num_y
            )));
        }

        let x_base_size = self.num_x / x;
        let y_base_size = self.num_y / y;
        let mut extra_y = self.num_y % y;

        let mut tiles = Vec::with_capacity(x * y);
        let mut cell_y = 0usize;
        for _at_y in 0..y {
            let mut cell_y_size = y_base_size;
            if extra_y > 0 {
                cell_y_size += 1;
                extra_y -= 1;
            }
            let new_nw_lat = self.nw_lat_deg - cell_y as f64 * self.lat_spacing_deg;
            let new_se_lat = new_nw_lat - cell_y_size as f64 * self.lat_spacing_deg;

            // Unlike the upstream implementation (which only distributes
            // remainder columns across the first row), reset per row so
            // every row tiles to the same column widths.
            let mut extra_x = self.num_x % x;
            let mut cell_x = 0usize;
            for _at_x in 0..x {
                let mut cell_x_size = x_base_size;
                if extra_x > 0 {
                    cell_x_size += 1;
                    extra_x -= 1;
                }
                let new_nw_lon = self.nw_lon_deg + cell_x as f64 * self.lon_spacing_deg;
                let new_se_lon = new_nw_lon + cell_x_size as f64 * self.lon_spacing_deg;

                let mut new_one = self.clone();
                new_one.start_x = cell_x;
                new_one.start_y = cell_y;
                new_one.num_x = cell_x_size;
                new_one.num_y = cell_y_size;
                new_one.nw_lat_deg = new_nw_lat;
                new_one.se_lat_deg = new_se_lat;
                new_one.nw_lon_deg = new_nw_lon;
                new_one.se_lon_deg = new_se_lon;
                new_one.sync();
                tiles.push(new_one);

                cell_x += cell_x_size;
            }
            cell_y += cell_y_size;
        }

        Ok(tiles)
    }

    /// A string unique to this grid's shape, suitable as a cache key
    /// (mirrors the fields compared by equality, minus the raw height
    /// parse string convention which only affects this key's readability).
    pub fn parse_unique_string(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}_{}_{}_{}_{}_{}_{}",
            self.nw_lat_deg,
            self.nw_lon_deg,
            self.se_lat_deg,
            self.se_lon_deg,
            self.lat_spacing_deg,
            self.lon_spacing_deg,
            self.start_x,
            self.start_y,
            self.num_x,
            self.num_y,
            self.num_z(),
            self.height_parse
        )
    }

    /// Parse a grid-language string: `nw(lat,lon) se(lat,lon) s(latd,lond)
    /// [h(lowKm,highKm,incrKeyOrKm)]`.
    pub fn parse(grid: &str) -> FusionResult<Self> {
        let functions = tokenize(grid)?;
        if functions.is_empty() {
            return Err(FusionError::InvalidGridSpec(format!(
                "unrecognized grid language: '{grid}'"
            )));
        }

        let mut nw = (55.0f64, -130.0f64);
        let mut se = (20.0f64, -60.0f64);
        let mut spacing = (0.01f64, 0.01f64);
        let mut heights_km = vec![0.0f64];
        let mut height_parse = String::new();
        let mut have_nw = false;
        let mut have_se = false;
        let mut have_s = false;

        for (f, p) in &functions {
            match f.as_str() {
                "nw" => {
                    nw = parse_degrees(&p)?;
                    have_nw = true;
                }
                "se" => {
                    se = parse_degrees(&p)?;
                    have_se = true;
                }
                "s" => {
                    spacing = parse_degrees(&p)?;
                    have_s = true;
                }
                "h" => {
                    let (h, key) = parse_heights(&p)?;
                    heights_km = h;
                    height_parse = key;
                }
                other => {
                    return Err(FusionError::InvalidGridSpec(format!(
                        "unrecognized grid function '{other}'"
                    )));
                }
            }
        }

        if !have_nw {
            return Err(FusionError::InvalidGridSpec("missing nw() grid corner".into()));
        }
        if !have_se {
            return Err(FusionError::InvalidGridSpec("missing se() grid corner".into()));
        }
        if !have_s {
            return Err(FusionError::InvalidGridSpec("missing s() grid spacing".into()));
        }
        if nw.0 <= se.0 {
            return Err(FusionError::InvalidGridSpec(
                "nw latitude must be north of se latitude".into(),
            ));
        }
        if nw.1 >= se.1 {
            return Err(FusionError::InvalidGridSpec(
                "nw longitude must be west of se longitude".into(),
            ));
        }

        let num_x = ((se.1 - nw.1) / spacing.1).abs().round() as usize;
        let num_y = ((nw.0 - se.0) / spacing.0).abs().round() as usize;

        let mut area = LLCoverageArea::default();
        area.set(nw.0, nw.1, se.0, se.1, spacing.0, spacing.1, num_x, num_y);
        area.heights_km = heights_km;
        area.height_parse = height_parse;
        Ok(area)
    }
}

fn tokenize(grid: &str) -> FusionResult<Vec<(String, String)>> {
    let mut functions = Vec::new();
    let mut function = String::new();
    let mut params = String::new();
    let mut inside = false;

    for c in grid.chars() {
        if !inside {
            if c == '(' {
                inside = true;
            } else {
                function.push(c);
            }
        } else if c == ')' {
            inside = false;
            functions.push((function.trim().to_string(), params.trim().to_string()));
            function.clear();
            params.clear();
        } else {
            params.push(c);
        }
    }
    if inside {
        functions.push((function.trim().to_string(), params.trim().to_string()));
    }
    Ok(functions)
}

fn parse_degrees(p: &str) -> FusionResult<(f64, f64)> {
    let pieces: Vec<&str> = p.split(',').collect();
    if pieces.len() != 2 {
        return Err(FusionError::InvalidGridSpec(format!(
            "expected 'lat,lon' pair, got '{p}'"
        )));
    }
    let lat: f64 = pieces[0]
        .trim()
        .parse()
        .map_err(|_| FusionError::InvalidGridSpec(format!("not a number: '{}'", pieces[0])))?;
    let lon: f64 = pieces[1]
        .trim()
        .parse()
        .map_err(|_| FusionError::InvalidGridSpec(format!("not a number: '{}'", pieces[1])))?;
    Ok((lat, lon))
}

/// Named incr/upto height-layer tables, meters, carried over from the
/// fixed CONUS layer sets used operationally.
fn lookup_incr_upto(key: &str) -> Option<(Vec<i64>, Vec<i64>)> {
    match key {
        "ARPS" => Some((vec![250, 500, 1000, 1000], vec![4000, 9000, 18000, 99999])),
        "WISH" => Some((vec![250, 500, 1000, 2000], vec![3000, 9000, 16000, 99999])),
        "NMQWD" => Some((vec![250, 500, 1000], vec![3000, 9000, 99999])),
        "Uniform1Km" => Some((vec![1000], vec![99999])),
        "XVision" => Some((vec![500, 1000], vec![5000, 99999])),
        _ => None,
    }
}

const MAX_HEIGHTS_ALLOWED: usize = 100;

fn generate_height_list(low: f64, high: f64, incr: &[i64], upto: &[i64]) -> FusionResult<Vec<f64>> {
    let mut heights = Vec::new();
    let mut at_height = low;
    let mut count = 0usize;
    loop {
        count += 1;
        if count >= MAX_HEIGHTS_ALLOWED {
            return Err(FusionError::InvalidGridSpec(format!(
                "generated more than {count} heights from grid spec"
            )));
        }
        heights.push(at_height);
        let mut advanced = false;
        for (i, u) in upto.iter().enumerate() {
            if at_height < *u as f64 {
                at_height += incr[i] as f64;
                advanced = true;
                break;
            }
        }
        if !advanced || at_height >= high {
            break;
        }
    }
    Ok(heights)
}

/// `lowKm,highKm,incrKeyOrKm` -> (heights in km, cache-key fragment).
fn parse_heights(p: &str) -> FusionResult<(Vec<f64>, String)> {
    let pieces: Vec<&str> = p.split(',').collect();
    if pieces.len() != 3 {
        return Err(FusionError::InvalidGridSpec(format!(
            "expected 'low,high,incr' triple, got '{p}'"
        )));
    }
    let mut low: f64 = pieces[0]
        .trim()
        .parse()
        .map_err(|_| FusionError::InvalidGridSpec(format!("not a number: '{}'", pieces[0])))?;
    let mut high: f64 = pieces[1]
        .trim()
        .parse()
        .map_err(|_| FusionError::InvalidGridSpec(format!("not a number: '{}'", pieces[1])))?;
    low *= 1000.0;
    high *= 1000.0;
    if high < low {
        std::mem::swap(&mut low, &mut high);
    }

    let key = pieces[2].trim();
    let (incr, upto, cache_key) = if let Some((incr, upto)) = lookup_incr_upto(key) {
        (incr, upto, key.to_string())
    } else {
        let up: f64 = key
            .parse()
            .map_err(|_| FusionError::InvalidGridSpec(format!("unknown height key '{key}'")))?;
        let incr_m = (up * 1000.0) as i64;
        (vec![incr_m], vec![99999], format!("{incr_m}_99999"))
    };

    let mut heights_m = generate_height_list(low, high, &incr, &upto)?;
    for h in heights_m.iter_mut() {
        *h /= 1000.0;
    }
    Ok((heights_m, format!("{low}_{high}_{cache_key}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_grid_language() {
        let area = LLCoverageArea::parse("nw(55,-130) se(20,-60) s(0.05,0.05) h(0,1,Uniform1Km)").unwrap();
        assert_eq!(area.nw_lat_deg, 55.0);
        assert_eq!(area.se_lon_deg, -60.0);
        assert_eq!(area.heights_km, vec![0.0, 1.0]);
        assert!(area.num_x > 0 && area.num_y > 0);
    }

    #[test]
    fn parses_default_2d_grid_without_heights() {
        let area = LLCoverageArea::parse("nw(45,-100) se(35,-90) s(0.01,0.01)").unwrap();
        assert_eq!(area.heights_km, vec![0.0]);
    }

    #[test]
    fn rejects_missing_corner() {
        let err = LLCoverageArea::parse("nw(45,-100) s(0.01,0.01)").unwrap_err();
        assert!(matches!(err, FusionError::InvalidGridSpec(_)));
    }

    #[test]
    fn rejects_inverted_corners() {
        let err = LLCoverageArea::parse("nw(20,-60) se(55,-130) s(0.01,0.01)").unwrap_err();
        assert!(matches!(err, FusionError::InvalidGridSpec(_)));
    }

    #[test]
    fn tile_covers_every_cell_exactly_once() {
        let mut area = LLCoverageArea::default();
        area.set(40.0, -100.0, 30.0, -90.0, 0.1, 0.1, 103, 47);
        let tiles = area.tile(4, 3).unwrap();
        assert_eq!(tiles.len(), 12);
        let total_x: usize = tiles.iter().step_by(3).map(|t| t.num_x).sum();
        assert_eq!(total_x, area.num_x);
        let total_y: usize = tiles[0..3].iter().map(|t| t.num_y).sum();
        assert_eq!(total_y, area.num_y);
    }

    #[test]
    fn tile_rejects_more_tiles_than_cells() {
        let mut area = LLCoverageArea::default();
        area.set(40.0, -100.0, 39.0, -99.0, 0.5, 0.5, 2, 2);
        assert!(area.tile(5, 1).is_err());
    }
}
