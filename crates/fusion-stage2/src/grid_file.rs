//! The Stage-2 -> downstream (TileJoin / rendering) transport for one
//! merged output layer: a single height's `LatLonGrid`, sparse-encoded
//! the same way `SparseGridCodec` already encodes Stage 1's radar-local
//! layers, since a CONUS-scale merged layer is still mostly
//! `DATA_UNAVAILABLE` outside combined radar coverage.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fusion_common::error::{io_error, FusionError, FusionResult};
use fusion_common::time::EpochSeconds;
use fusion_datatypes::{LatLonGrid, PixelRun, SparseGridCodec};

const MAGIC: u32 = 0x52_4D_47_47; // "RMGG"

#[derive(Debug, Clone, PartialEq)]
pub struct MergedGridFile {
    pub type_name: String,
    pub subtype: String,
    pub time: EpochSeconds,
    pub nw_lat_deg: f64,
    pub nw_lon_deg: f64,
    pub lat_spacing_deg: f64,
    pub lon_spacing_deg: f64,
    pub height_m: f64,
    pub num_lat: u32,
    pub num_lon: u32,
    pub runs: Vec<PixelRun>,
}

fn write_string<W: Write>(w: &mut W, s: &str) -> FusionResult<()> {
    let bytes = s.as_bytes();
    w.write_u32::<LittleEndian>(bytes.len() as u32)
        .map_err(|e| io_error("merged-grid-file", e))?;
    w.write_all(bytes).map_err(|e| io_error("merged-grid-file", e))
}

fn read_string<R: Read>(r: &mut R) -> FusionResult<String> {
    let len = r.read_u32::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))? as usize;
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes).map_err(|e| io_error("merged-grid-file", e))?;
    String::from_utf8(bytes).map_err(|_| FusionError::CorruptArtifact("merged grid file string is not utf8".to_string()))
}

impl MergedGridFile {
    /// Sparse-encode one layer of an already-finalized grid.
    pub fn from_grid(type_name: impl Into<String>, subtype: impl Into<String>, time: EpochSeconds, grid: &LatLonGrid) -> Self {
        Self {
            type_name: type_name.into(),
            subtype: subtype.into(),
            time,
            nw_lat_deg: grid.nw_lat_deg,
            nw_lon_deg: grid.nw_lon_deg,
            lat_spacing_deg: grid.lat_spacing_deg,
            lon_spacing_deg: grid.lon_spacing_deg,
            height_m: grid.height_m,
            num_lat: grid.num_lat() as u32,
            num_lon: grid.num_lon() as u32,
            runs: SparseGridCodec::encode_layer(grid, 0),
        }
    }

    /// Reconstruct the dense `LatLonGrid`, `DATA_UNAVAILABLE` outside
    /// whatever runs this file carries.
    pub fn to_grid(&self) -> LatLonGrid {
        let mut grid = LatLonGrid::new(
            self.nw_lat_deg,
            self.nw_lon_deg,
            self.lat_spacing_deg,
            self.lon_spacing_deg,
            self.height_m,
            self.num_lat as usize,
            self.num_lon as usize,
        );
        SparseGridCodec::decode_into(&mut grid, &self.runs, 0);
        grid
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> FusionResult<()> {
        w.write_u32::<LittleEndian>(MAGIC).map_err(|e| io_error("merged-grid-file", e))?;
        write_string(&mut w, &self.type_name)?;
        write_string(&mut w, &self.subtype)?;
        w.write_i64::<LittleEndian>(self.time).map_err(|e| io_error("merged-grid-file", e))?;
        w.write_f64::<LittleEndian>(self.nw_lat_deg).map_err(|e| io_error("merged-grid-file", e))?;
        w.write_f64::<LittleEndian>(self.nw_lon_deg).map_err(|e| io_error("merged-grid-file", e))?;
        w.write_f64::<LittleEndian>(self.lat_spacing_deg).map_err(|e| io_error("merged-grid-file", e))?;
        w.write_f64::<LittleEndian>(self.lon_spacing_deg).map_err(|e| io_error("merged-grid-file", e))?;
        w.write_f64::<LittleEndian>(self.height_m).map_err(|e| io_error("merged-grid-file", e))?;
        w.write_u32::<LittleEndian>(self.num_lat).map_err(|e| io_error("merged-grid-file", e))?;
        w.write_u32::<LittleEndian>(self.num_lon).map_err(|e| io_error("merged-grid-file", e))?;

        w.write_u32::<LittleEndian>(self.runs.len() as u32)
            .map_err(|e| io_error("merged-grid-file", e))?;
        for run in &self.runs {
            w.write_u32::<LittleEndian>(run.x).map_err(|e| io_error("merged-grid-file", e))?;
            w.write_u32::<LittleEndian>(run.y).map_err(|e| io_error("merged-grid-file", e))?;
            w.write_u32::<LittleEndian>(run.count).map_err(|e| io_error("merged-grid-file", e))?;
            w.write_f32::<LittleEndian>(run.value).map_err(|e| io_error("merged-grid-file", e))?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(mut r: R) -> FusionResult<Self> {
        let magic = r.read_u32::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?;
        if magic != MAGIC {
            return Err(FusionError::CorruptArtifact("bad merged grid file magic".to_string()));
        }
        let type_name = read_string(&mut r)?;
        let subtype = read_string(&mut r)?;
        let time = r.read_i64::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?;
        let nw_lat_deg = r.read_f64::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?;
        let nw_lon_deg = r.read_f64::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?;
        let lat_spacing_deg = r.read_f64::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?;
        let lon_spacing_deg = r.read_f64::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?;
        let height_m = r.read_f64::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?;
        let num_lat = r.read_u32::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?;
        let num_lon = r.read_u32::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?;

        let num_runs = r.read_u32::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?;
        let mut runs = Vec::with_capacity(num_runs as usize);
        for _ in 0..num_runs {
            runs.push(PixelRun {
                x: r.read_u32::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?,
                y: r.read_u32::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?,
                z: 0,
                count: r.read_u32::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?,
                value: r.read_f32::<LittleEndian>().map_err(|e| io_error("merged-grid-file", e))?,
            });
        }

        Ok(Self {
            type_name,
            subtype,
            time,
            nw_lat_deg,
            nw_lon_deg,
            lat_spacing_deg,
            lon_spacing_deg,
            height_m,
            num_lat,
            num_lon,
            runs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_sparse_layer_through_bytes() {
        let mut grid = LatLonGrid::new(40.0, -100.0, 0.01, 0.01, 500.0, 4, 4);
        grid.set_value(1, 1, 25.0);
        grid.set_value(1, 2, 25.0);
        grid.set_value(3, 0, 10.0);

        let file = MergedGridFile::from_grid("Reflectivity", "00.50", 1_700_000_000, &grid);
        let mut buf = Vec::new();
        file.write_to(&mut buf).unwrap();
        let back = MergedGridFile::read_from(&buf[..]).unwrap();
        assert_eq!(back, file);

        let restored = back.to_grid();
        assert_eq!(restored.value(1, 1), 25.0);
        assert_eq!(restored.value(1, 2), 25.0);
        assert_eq!(restored.value(3, 0), 10.0);
        assert_eq!(restored.value(0, 0), fusion_common::constants::DATA_UNAVAILABLE);
    }
}
