//! `DataGrid`: a named, versioned map of dimensions, named typed arrays
//! bound to a dimension index list, and an attribute bag. Every concrete
//! type in this crate (`RadialSet`, `LatLonGrid`, ...) wraps one of
//! these rather than inheriting from it.

use crate::attributes::AttributeBag;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct NamedDimension {
    pub name: String,
    pub size: usize,
}

/// A typed, flat backing array for a named grid variable. Dimensions are
/// addressed row-major in the order given by the array's `dim_indices`.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayStorage {
    Byte(Vec<u8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl ArrayStorage {
    pub fn len(&self) -> usize {
        match self {
            ArrayStorage::Byte(v) => v.len(),
            ArrayStorage::Short(v) => v.len(),
            ArrayStorage::Int(v) => v.len(),
            ArrayStorage::Float(v) => v.len(),
            ArrayStorage::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_float(&self) -> Option<&[f32]> {
        match self {
            ArrayStorage::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float_mut(&mut self) -> Option<&mut [f32]> {
        match self {
            ArrayStorage::Float(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedArray {
    /// Indices into the owning `DataGrid`'s `dims`, in storage order.
    pub dim_indices: Vec<usize>,
    pub storage: ArrayStorage,
}

/// The generic N-D named-array grid that every concrete DataType wraps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataGrid {
    dims: Vec<NamedDimension>,
    arrays: HashMap<String, NamedArray>,
    pub attributes: AttributeBag,
}

impl DataGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or fetch the existing) named dimension, returning its index.
    pub fn add_dimension(&mut self, name: &str, size: usize) -> usize {
        if let Some(i) = self.dims.iter().position(|d| d.name == name) {
            self.dims[i].size = size;
            return i;
        }
        self.dims.push(NamedDimension {
            name: name.to_string(),
            size,
        });
        self.dims.len() - 1
    }

    pub fn dims(&self) -> &[NamedDimension] {
        &self.dims
    }

    pub fn dim_size(&self, idx: usize) -> usize {
        self.dims[idx].size
    }

    /// Bind a named array to a list of (already-added) dimension
    /// indices. The storage length must equal the product of those
    /// dimensions' sizes (every array sharing a dim-index list shares
    /// extents, per the data-model invariant).
    pub fn add_array(&mut self, name: &str, dim_indices: Vec<usize>, storage: ArrayStorage) {
        let expected: usize = dim_indices.iter().map(|&i| self.dims[i].size).product();
        debug_assert_eq!(
            storage.len(),
            expected,
            "array '{name}' size mismatch: expected {expected}, got {}",
            storage.len()
        );
        self.arrays.insert(
            name.to_string(),
            NamedArray {
                dim_indices,
                storage,
            },
        );
    }

    pub fn array(&self, name: &str) -> Option<&NamedArray> {
        self.arrays.get(name)
    }

    pub fn array_mut(&mut self, name: &str) -> Option<&mut NamedArray> {
        self.arrays.get_mut(name)
    }

    pub fn array_names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    pub fn float_array(&self, name: &str) -> Option<&[f32]> {
        self.array(name).and_then(|a| a.storage.as_float())
    }

    pub fn float_array_mut(&mut self, name: &str) -> Option<&mut [f32]> {
        self.array_mut(name).and_then(|a| a.storage.as_float_mut())
    }
}
