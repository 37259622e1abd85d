//! The wire format Stage 1 sends to Stage 2: a sparse table of
//! `(value, weight)` observations plus a separately RLE-encoded table
//! of cells explicitly observed as missing (background, no echo) —
//! distinct from a cell that was simply never in any radar's coverage
//! at all, which never appears in the message either way.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fusion_common::error::{io_error, FusionError, FusionResult};
use fusion_common::time::EpochSeconds;

const MAGIC: u32 = 0x52_4D_5332; // "RMS2"

/// A run of contiguous cells (along x, within one (y, z) row) carrying
/// the same resolved `(value, weight)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueWeightRun {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub count: u32,
    pub value: f32,
    pub weight: f32,
}

/// A run of contiguous cells explicitly observed as missing (no
/// echo), as opposed to cells outside this radar's coverage entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissingRun {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage2Message {
    pub radar_name: String,
    pub moment: String,
    pub data_time: EpochSeconds,
    pub x_base: u32,
    pub y_base: u32,
    pub num_x: u32,
    pub num_y: u32,
    pub num_z: u32,
    pub observations: Vec<ValueWeightRun>,
    pub missing: Vec<MissingRun>,
}

fn write_string<W: Write>(w: &mut W, s: &str) -> FusionResult<()> {
    let bytes = s.as_bytes();
    w.write_u32::<LittleEndian>(bytes.len() as u32)
        .map_err(|e| io_error("stage2-message", e))?;
    w.write_all(bytes).map_err(|e| io_error("stage2-message", e))
}

fn read_string<R: Read>(r: &mut R) -> FusionResult<String> {
    let len = r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))? as usize;
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes).map_err(|e| io_error("stage2-message", e))?;
    String::from_utf8(bytes).map_err(|_| FusionError::CorruptArtifact("stage2 message string is not utf8".to_string()))
}

impl Stage2Message {
    pub fn write_to<W: Write>(&self, mut w: W) -> FusionResult<()> {
        w.write_u32::<LittleEndian>(MAGIC).map_err(|e| io_error("stage2-message", e))?;
        write_string(&mut w, &self.radar_name)?;
        write_string(&mut w, &self.moment)?;
        w.write_i64::<LittleEndian>(self.data_time).map_err(|e| io_error("stage2-message", e))?;
        w.write_u32::<LittleEndian>(self.x_base).map_err(|e| io_error("stage2-message", e))?;
        w.write_u32::<LittleEndian>(self.y_base).map_err(|e| io_error("stage2-message", e))?;
        w.write_u32::<LittleEndian>(self.num_x).map_err(|e| io_error("stage2-message", e))?;
        w.write_u32::<LittleEndian>(self.num_y).map_err(|e| io_error("stage2-message", e))?;
        w.write_u32::<LittleEndian>(self.num_z).map_err(|e| io_error("stage2-message", e))?;

        w.write_u32::<LittleEndian>(self.observations.len() as u32)
            .map_err(|e| io_error("stage2-message", e))?;
        for run in &self.observations {
            w.write_u32::<LittleEndian>(run.x).map_err(|e| io_error("stage2-message", e))?;
            w.write_u32::<LittleEndian>(run.y).map_err(|e| io_error("stage2-message", e))?;
            w.write_u32::<LittleEndian>(run.z).map_err(|e| io_error("stage2-message", e))?;
            w.write_u32::<LittleEndian>(run.count).map_err(|e| io_error("stage2-message", e))?;
            w.write_f32::<LittleEndian>(run.value).map_err(|e| io_error("stage2-message", e))?;
            w.write_f32::<LittleEndian>(run.weight).map_err(|e| io_error("stage2-message", e))?;
        }

        w.write_u32::<LittleEndian>(self.missing.len() as u32)
            .map_err(|e| io_error("stage2-message", e))?;
        for run in &self.missing {
            w.write_u32::<LittleEndian>(run.x).map_err(|e| io_error("stage2-message", e))?;
            w.write_u32::<LittleEndian>(run.y).map_err(|e| io_error("stage2-message", e))?;
            w.write_u32::<LittleEndian>(run.z).map_err(|e| io_error("stage2-message", e))?;
            w.write_u32::<LittleEndian>(run.count).map_err(|e| io_error("stage2-message", e))?;
        }

        Ok(())
    }

    pub fn read_from<R: Read>(mut r: R) -> FusionResult<Self> {
        let magic = r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?;
        if magic != MAGIC {
            return Err(FusionError::CorruptArtifact("bad stage2 message magic".to_string()));
        }
        let radar_name = read_string(&mut r)?;
        let moment = read_string(&mut r)?;
        let data_time = r.read_i64::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?;
        let x_base = r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?;
        let y_base = r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?;
        let num_x = r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?;
        let num_y = r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?;
        let num_z = r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?;

        let num_obs = r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?;
        let mut observations = Vec::with_capacity(num_obs as usize);
        for _ in 0..num_obs {
            observations.push(ValueWeightRun {
                x: r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?,
                y: r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?,
                z: r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?,
                count: r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?,
                value: r.read_f32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?,
                weight: r.read_f32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?,
            });
        }

        let num_missing = r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?;
        let mut missing = Vec::with_capacity(num_missing as usize);
        for _ in 0..num_missing {
            missing.push(MissingRun {
                x: r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?,
                y: r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?,
                z: r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?,
                count: r.read_u32::<LittleEndian>().map_err(|e| io_error("stage2-message", e))?,
            });
        }

        Ok(Self {
            radar_name,
            moment,
            data_time,
            x_base,
            y_base,
            num_x,
            num_y,
            num_z,
            observations,
            missing,
        })
    }

    /// Expand the run-length encoded observations back into individual
    /// `(x, y, z, value, weight)` cells, in global grid coordinates
    /// (`x_base`/`y_base` already added).
    pub fn iter_observations(&self) -> impl Iterator<Item = (u32, u32, u32, f32, f32)> + '_ {
        self.observations.iter().flat_map(move |run| {
            (0..run.count).map(move |i| (self.x_base + run.x + i, self.y_base + run.y, run.z, run.value, run.weight))
        })
    }

    pub fn iter_missing(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        self.missing
            .iter()
            .flat_map(move |run| (0..run.count).map(move |i| (self.x_base + run.x + i, self.y_base + run.y, run.z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let msg = Stage2Message {
            radar_name: "KTLX".to_string(),
            moment: "Reflectivity".to_string(),
            data_time: 1_700_000_000,
            x_base: 100,
            y_base: 200,
            num_x: 10,
            num_y: 10,
            num_z: 1,
            observations: vec![ValueWeightRun {
                x: 0,
                y: 0,
                z: 0,
                count: 3,
                value: 25.0,
                weight: 0.8,
            }],
            missing: vec![MissingRun {
                x: 3,
                y: 0,
                z: 0,
                count: 2,
            }],
        };
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();
        let back = Stage2Message::read_from(&buf[..]).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn iter_observations_expands_runs_with_global_offsets() {
        let msg = Stage2Message {
            radar_name: "KTLX".to_string(),
            moment: "Reflectivity".to_string(),
            data_time: 0,
            x_base: 100,
            y_base: 200,
            num_x: 10,
            num_y: 10,
            num_z: 1,
            observations: vec![ValueWeightRun {
                x: 0,
                y: 1,
                z: 0,
                count: 2,
                value: 25.0,
                weight: 0.8,
            }],
            missing: vec![],
        };
        let cells: Vec<_> = msg.iter_observations().collect();
        assert_eq!(cells, vec![(100, 201, 0, 25.0, 0.8), (101, 201, 0, 25.0, 0.8)]);
    }
}
