//! Volume-value resolvers: pluggable per-cell interpolators that turn
//! the tilts enclosing a target cell into a single weighted value
//! contribution. `lak` is the production default; `robert` is a
//! simpler linear alternative; `nearest`/`range`/`azimuth`/`terrain`
//! are diagnostic resolvers that report geometry instead of a value.

pub mod diagnostic;
pub mod lak;
pub mod query;
pub mod registry;
pub mod resolver;
pub mod robert;

pub use diagnostic::{AzimuthVVResolver, NearestVVResolver, RangeVVResolver, TerrainVVResolver};
pub use lak::LakResolver1;
pub use query::{range_to_weight, ResolverOutput, ResolverQuery, TiltSample};
pub use registry::build_resolver;
pub use resolver::VolumeValueResolver;
pub use robert::RobertLinearResolver;
