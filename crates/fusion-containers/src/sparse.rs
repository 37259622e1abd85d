//! A sparse vector: a bit-packed lookup table of `max_size` slots, each
//! holding either "empty" or an index into a densely packed storage
//! vector. Used for the per-source observation lists in the merge
//! database, where most cells of the CONUS grid never get a value from
//! any one source.

use crate::bitset::Bitset;
use crate::dimension::DimensionMapper;

pub struct SparseVector<T> {
    lookup: Bitset,
    storage: Vec<T>,
    missing: u64,
}

impl<T> SparseVector<T> {
    pub fn new(max_size: usize) -> Self {
        Self::with_dims(DimensionMapper::new(vec![max_size]))
    }

    pub fn with_dims(dims: DimensionMapper) -> Self {
        let bits = smallest_bits_to_store(dims.size() as u64);
        let mut lookup = Bitset::with_dims(dims, bits);
        lookup.set_all();
        let missing = lookup.max_value();
        Self {
            lookup,
            storage: Vec::new(),
            missing,
        }
    }

    pub fn get(&self, i: usize) -> Option<&T> {
        let offset = self.lookup.get(i);
        if offset == self.missing {
            None
        } else {
            Some(&self.storage[offset as usize])
        }
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut T> {
        let offset = self.lookup.get(i);
        if offset == self.missing {
            None
        } else {
            Some(&mut self.storage[offset as usize])
        }
    }

    pub fn set(&mut self, i: usize, value: T) {
        let offset = self.lookup.get(i);
        if offset == self.missing {
            let new_offset = self.storage.len() as u64;
            self.lookup.set(i, new_offset);
            self.storage.push(value);
        } else {
            self.storage[offset as usize] = value;
        }
    }

    pub fn index_3d(&self, x: usize, y: usize, z: usize) -> usize {
        self.lookup.index_3d(x, y, z)
    }

    pub fn get_3d(&self, x: usize, y: usize, z: usize) -> Option<&T> {
        self.get(self.index_3d(x, y, z))
    }

    pub fn set_3d(&mut self, x: usize, y: usize, z: usize, value: T) {
        let i = self.index_3d(x, y, z);
        self.set(i, value);
    }

    /// Fraction of lookup slots that hold a real value, `0.0..=100.0`.
    pub fn percent_full(&self) -> f32 {
        let num = self.lookup.len();
        if num == 0 {
            0.0
        } else {
            self.storage.len() as f32 / num as f32 * 100.0
        }
    }

    pub fn stored_len(&self) -> usize {
        self.storage.len()
    }
}

/// Smallest number of bits needed to hold values `0..=max_inclusive`.
pub fn smallest_bits_to_store(max_inclusive: u64) -> usize {
    if max_inclusive == 0 {
        return 1;
    }
    (64 - max_inclusive.leading_zeros()) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_fully_empty() {
        let sv: SparseVector<f32> = SparseVector::new(1000);
        assert_eq!(sv.get(500), None);
        assert_eq!(sv.percent_full(), 0.0);
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut sv: SparseVector<f32> = SparseVector::new(1000);
        sv.set(42, 12.5);
        assert_eq!(sv.get(42), Some(&12.5));
        assert_eq!(sv.get(41), None);
        assert_eq!(sv.stored_len(), 1);
    }

    #[test]
    fn overwriting_does_not_grow_storage() {
        let mut sv: SparseVector<f32> = SparseVector::new(1000);
        sv.set(42, 1.0);
        sv.set(42, 2.0);
        assert_eq!(sv.get(42), Some(&2.0));
        assert_eq!(sv.stored_len(), 1);
    }

    #[test]
    fn three_dimensional_addressing() {
        let mut sv: SparseVector<f32> = SparseVector::with_dims(DimensionMapper::new(vec![10, 10, 5]));
        sv.set_3d(3, 4, 2, 99.0);
        assert_eq!(sv.get_3d(3, 4, 2), Some(&99.0));
        assert_eq!(sv.get_3d(3, 4, 1), None);
    }

    #[test]
    fn bits_to_store_matches_expected_widths() {
        assert_eq!(smallest_bits_to_store(1), 1);
        assert_eq!(smallest_bits_to_store(255), 8);
        assert_eq!(smallest_bits_to_store(256), 9);
    }
}
