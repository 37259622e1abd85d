//! The `.mask` file Roster writes back per radar: a packed bitset over
//! that radar's local sub-area saying which cells it's one of the
//! nearest-N contributors for. Stage 1 reads its own mask file before
//! emitting Stage 2 data, so cells a radar lost to a closer one never
//! cross the wire at all.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fusion_common::error::{io_error, FusionError, FusionResult};
use fusion_containers::{Bitset, DimensionMapper};

const MAGIC: u32 = 0xFC_AC_0002;

pub struct MaskFile {
    pub radar_name: String,
    pub fingerprint: u64,
    pub start_x: u32,
    pub start_y: u32,
    pub num_x: u32,
    pub num_y: u32,
    pub num_z: u32,
    pub mask: Bitset,
}

impl MaskFile {
    pub fn write_to<W: Write>(&self, mut w: W) -> FusionResult<()> {
        w.write_u32::<LittleEndian>(MAGIC).map_err(|e| io_error("mask", e))?;
        let name_bytes = self.radar_name.as_bytes();
        w.write_u32::<LittleEndian>(name_bytes.len() as u32)
            .map_err(|e| io_error("mask", e))?;
        w.write_all(name_bytes).map_err(|e| io_error("mask", e))?;
        w.write_u64::<LittleEndian>(self.fingerprint).map_err(|e| io_error("mask", e))?;
        w.write_u32::<LittleEndian>(self.start_x).map_err(|e| io_error("mask", e))?;
        w.write_u32::<LittleEndian>(self.start_y).map_err(|e| io_error("mask", e))?;
        w.write_u32::<LittleEndian>(self.num_x).map_err(|e| io_error("mask", e))?;
        w.write_u32::<LittleEndian>(self.num_y).map_err(|e| io_error("mask", e))?;
        w.write_u32::<LittleEndian>(self.num_z).map_err(|e| io_error("mask", e))?;
        let words = self.mask.words();
        w.write_u32::<LittleEndian>(words.len() as u32)
            .map_err(|e| io_error("mask", e))?;
        for word in words {
            w.write_u64::<LittleEndian>(*word).map_err(|e| io_error("mask", e))?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(mut r: R) -> FusionResult<Self> {
        let magic = r.read_u32::<LittleEndian>().map_err(|e| io_error("mask", e))?;
        if magic != MAGIC {
            return Err(FusionError::CorruptArtifact("bad mask magic".to_string()));
        }
        let name_len = r.read_u32::<LittleEndian>().map_err(|e| io_error("mask", e))? as usize;
        let mut name_bytes = vec![0u8; name_len];
        r.read_exact(&mut name_bytes).map_err(|e| io_error("mask", e))?;
        let radar_name = String::from_utf8(name_bytes)
            .map_err(|_| FusionError::CorruptArtifact("mask radar name is not utf8".to_string()))?;

        let fingerprint = r.read_u64::<LittleEndian>().map_err(|e| io_error("mask", e))?;
        let start_x = r.read_u32::<LittleEndian>().map_err(|e| io_error("mask", e))?;
        let start_y = r.read_u32::<LittleEndian>().map_err(|e| io_error("mask", e))?;
        let num_x = r.read_u32::<LittleEndian>().map_err(|e| io_error("mask", e))?;
        let num_y = r.read_u32::<LittleEndian>().map_err(|e| io_error("mask", e))?;
        let num_z = r.read_u32::<LittleEndian>().map_err(|e| io_error("mask", e))?;
        let num_words = r.read_u32::<LittleEndian>().map_err(|e| io_error("mask", e))? as usize;

        let mut words = Vec::with_capacity(num_words);
        for _ in 0..num_words {
            words.push(r.read_u64::<LittleEndian>().map_err(|e| io_error("mask", e))?);
        }

        let dims = DimensionMapper::new(vec![num_x as usize, num_y as usize, num_z as usize]);
        let mask = Bitset::from_raw_parts(dims, 1, words);

        Ok(Self {
            radar_name,
            fingerprint,
            start_x,
            start_y,
            num_x,
            num_y,
            num_z,
            mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_sparse_mask() {
        let dims = DimensionMapper::new(vec![4, 4, 1]);
        let mut mask = Bitset::with_dims(dims, 1);
        mask.set1_3d(1, 2, 0);
        mask.set1_3d(3, 3, 0);

        let file = MaskFile {
            radar_name: "KTLX".to_string(),
            fingerprint: 42,
            start_x: 0,
            start_y: 0,
            num_x: 4,
            num_y: 4,
            num_z: 1,
            mask,
        };

        let mut buf = Vec::new();
        file.write_to(&mut buf).unwrap();
        let back = MaskFile::read_from(&buf[..]).unwrap();

        assert_eq!(back.radar_name, "KTLX");
        assert_eq!(back.fingerprint, 42);
        assert!(back.mask.is_set1(back.mask.index_3d(1, 2, 0)));
        assert!(back.mask.is_set1(back.mask.index_3d(3, 3, 0)));
        assert!(!back.mask.is_set1(back.mask.index_3d(0, 0, 0)));
    }
}
