//! Flattens N-dimensional coordinates into a single row-major index, the
//! way every grid-shaped container in the pipeline (bitmasks, sparse
//! observation vectors) addresses its backing storage.

/// Maps coordinates over a fixed set of dimensions to a flat index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionMapper {
    dims: Vec<usize>,
    strides: Vec<usize>,
    size: usize,
}

impl DimensionMapper {
    pub fn new(dims: Vec<usize>) -> Self {
        let mut strides = vec![1usize; dims.len()];
        for i in (0..dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * dims[i + 1];
        }
        let size = dims.iter().product();
        Self { dims, strides, size }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Flatten arbitrary-dimension coordinates. Panics (in debug) on a
    /// length mismatch, matching the precondition every caller already
    /// upholds by construction.
    pub fn index(&self, coords: &[usize]) -> usize {
        debug_assert_eq!(coords.len(), self.dims.len());
        coords
            .iter()
            .zip(self.strides.iter())
            .map(|(c, s)| c * s)
            .sum()
    }

    /// Flatten a 3D `(x, y, z)` coordinate. The grid containers address
    /// observations as `(x, y, z)` with `z` (height layer) varying
    /// slowest, matching how the observation store iterates layer by
    /// layer.
    pub fn index_3d(&self, x: usize, y: usize, z: usize) -> usize {
        self.index(&[x, y, z])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_3d_index() {
        let m = DimensionMapper::new(vec![2, 3, 4]); // x, y, z
        assert_eq!(m.index_3d(0, 0, 0), 0);
        assert_eq!(m.index_3d(0, 0, 1), 1);
        assert_eq!(m.index_3d(0, 1, 0), 4);
        assert_eq!(m.index_3d(1, 0, 0), 12);
        assert_eq!(m.size(), 24);
    }
}
