//! The fusion pipeline's DataType hierarchy.
//!
//! `DataGrid` is the common base every concrete type wraps: named
//! dimensions, named typed arrays bound to a dimension index list, and an
//! attribute bag. `RadialSet` (polar), `LatLonGrid` (2D), and
//! `LatLonHeightGrid`/`LLHGridN2D` (3D) build on it the way the original
//! system's `DataType <- DataGrid <- {LatLonGrid <- ..., RadialSet}`
//! inheritance chain did: here each is a tagged struct wrapping a
//! `DataGrid` rather than a class hierarchy (SPEC_FULL.md §9).

pub mod attributes;
pub mod grid;
pub mod latlon_grid;
pub mod llh_grid;
pub mod radial_set;
pub mod sparse_codec;

pub use attributes::{AttributeBag, AttributeValue};
pub use grid::{ArrayStorage, DataGrid, NamedDimension};
pub use latlon_grid::LatLonGrid;
pub use llh_grid::{LLHGridN2D, LatLonHeightGrid};
pub use radial_set::RadialSet;
pub use sparse_codec::{PixelRun, SparseGridCodec};
