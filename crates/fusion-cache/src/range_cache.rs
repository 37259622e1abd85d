//! The `.cache` file Stage 1 writes per radar: the per-cell nearest
//! range (in kilometers) within that radar's local sub-area of the
//! output grid. Roster reads every radar's `.cache` file to build the
//! global nearest-N mask; Stage 1 never reads its own back.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fusion_common::error::{io_error, FusionError, FusionResult};

const MAGIC: u32 = 0xFC_AC_0001;

#[derive(Debug, Clone, PartialEq)]
pub struct RangeCacheFile {
    pub radar_name: String,
    pub fingerprint: u64,
    pub start_x: u32,
    pub start_y: u32,
    pub num_x: u32,
    pub num_y: u32,
    pub num_z: u32,
    /// Nearest range in kilometers per `(z, y, x)` cell, row-major with
    /// `z` varying slowest (matches `DimensionMapper::index_3d`).
    pub ranges_km: Vec<f32>,
}

impl RangeCacheFile {
    pub fn cell_count(&self) -> usize {
        self.num_x as usize * self.num_y as usize * self.num_z as usize
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> FusionResult<()> {
        debug_assert_eq!(self.ranges_km.len(), self.cell_count());

        w.write_u32::<LittleEndian>(MAGIC).map_err(|e| io_error("range-cache", e))?;
        let name_bytes = self.radar_name.as_bytes();
        w.write_u32::<LittleEndian>(name_bytes.len() as u32)
            .map_err(|e| io_error("range-cache", e))?;
        w.write_all(name_bytes).map_err(|e| io_error("range-cache", e))?;
        w.write_u64::<LittleEndian>(self.fingerprint)
            .map_err(|e| io_error("range-cache", e))?;
        w.write_u32::<LittleEndian>(self.start_x).map_err(|e| io_error("range-cache", e))?;
        w.write_u32::<LittleEndian>(self.start_y).map_err(|e| io_error("range-cache", e))?;
        w.write_u32::<LittleEndian>(self.num_x).map_err(|e| io_error("range-cache", e))?;
        w.write_u32::<LittleEndian>(self.num_y).map_err(|e| io_error("range-cache", e))?;
        w.write_u32::<LittleEndian>(self.num_z).map_err(|e| io_error("range-cache", e))?;
        for v in &self.ranges_km {
            w.write_f32::<LittleEndian>(*v).map_err(|e| io_error("range-cache", e))?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(mut r: R) -> FusionResult<Self> {
        let magic = r.read_u32::<LittleEndian>().map_err(|e| io_error("range-cache", e))?;
        if magic != MAGIC {
            return Err(FusionError::CorruptArtifact("bad range-cache magic".to_string()));
        }
        let name_len = r.read_u32::<LittleEndian>().map_err(|e| io_error("range-cache", e))? as usize;
        let mut name_bytes = vec![0u8; name_len];
        r.read_exact(&mut name_bytes).map_err(|e| io_error("range-cache", e))?;
        let radar_name = String::from_utf8(name_bytes)
            .map_err(|_| FusionError::CorruptArtifact("range-cache radar name is not utf8".to_string()))?;

        let fingerprint = r.read_u64::<LittleEndian>().map_err(|e| io_error("range-cache", e))?;
        let start_x = r.read_u32::<LittleEndian>().map_err(|e| io_error("range-cache", e))?;
        let start_y = r.read_u32::<LittleEndian>().map_err(|e| io_error("range-cache", e))?;
        let num_x = r.read_u32::<LittleEndian>().map_err(|e| io_error("range-cache", e))?;
        let num_y = r.read_u32::<LittleEndian>().map_err(|e| io_error("range-cache", e))?;
        let num_z = r.read_u32::<LittleEndian>().map_err(|e| io_error("range-cache", e))?;

        let count = num_x as usize * num_y as usize * num_z as usize;
        let mut ranges_km = Vec::with_capacity(count);
        for _ in 0..count {
            ranges_km.push(r.read_f32::<LittleEndian>().map_err(|e| io_error("range-cache", e))?);
        }

        Ok(Self {
            radar_name,
            fingerprint,
            start_x,
            start_y,
            num_x,
            num_y,
            num_z,
            ranges_km,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let file = RangeCacheFile {
            radar_name: "KTLX".to_string(),
            fingerprint: 0xdeadbeef,
            start_x: 10,
            start_y: 20,
            num_x: 2,
            num_y: 2,
            num_z: 1,
            ranges_km: vec![1.0, 2.0, 3.0, 4.0],
        };
        let mut buf = Vec::new();
        file.write_to(&mut buf).unwrap();
        let back = RangeCacheFile::read_from(&buf[..]).unwrap();
        assert_eq!(back, file);
    }

    #[test]
    fn rejects_corrupt_magic() {
        let buf = vec![0u8; 32];
        assert!(RangeCacheFile::read_from(&buf[..]).is_err());
    }
}
