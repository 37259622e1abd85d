//! Memory-dense containers for CONUS-scale grids: a flat dimension
//! mapper, a bit-packed value array, and a sparse vector built on top of
//! it. These exist because a plain `Vec<Option<T>>` over a full 3D grid
//! would cost far more RAM than the pipeline can spend.

pub mod bitset;
pub mod dimension;
pub mod sparse;

pub use bitset::Bitset;
pub use dimension::DimensionMapper;
pub use sparse::{smallest_bits_to_store, SparseVector};
