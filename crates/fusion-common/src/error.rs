//! Error types shared by every stage of the fusion pipeline.

use thiserror::Error;

/// Result type alias using [`FusionError`].
pub type FusionResult<T> = Result<T, FusionError>;

/// Primary error type for the fusion engine.
///
/// Variants are grouped by the error kinds from the design: configuration
/// errors are fatal at startup, input/IPC errors degrade a single record
/// or tick, geometry errors are clamped rather than propagated (and so
/// never appear here), and resource errors are the only ones expected to
/// abort an already-running process.
#[derive(Debug, Error)]
pub enum FusionError {
    // === Configuration errors (fatal at startup) ===
    #[error("unknown resolver key: {0}")]
    UnknownResolver(String),

    #[error("unknown terrain blockage key: {0}")]
    UnknownTerrainModel(String),

    #[error("unknown volume key: {0}")]
    UnknownVolume(String),

    #[error("DEM not found for radar '{radar}': {path}")]
    MissingDem { radar: String, path: String },

    #[error("malformed grid specification: {0}")]
    InvalidGridSpec(String),

    // === Input errors (record dropped, tick continues) ===
    #[error("unreadable radial set: {0}")]
    UnreadableRadialSet(String),

    #[error("radar name mismatch: expected '{expected}', got '{got}'")]
    RadarMismatch { expected: String, got: String },

    #[error("stage-2 coordinate out of range: ({x}, {y}, {z})")]
    CoordinateOutOfRange { x: i64, y: i64, z: i64 },

    // === Resource errors (fatal, with diagnostic identity) ===
    #[error("failed to allocate bitmask for source '{source_name}' (id={source_id}, dims={dims:?})")]
    MaskAllocationFailed {
        source_name: String,
        source_id: u32,
        dims: (usize, usize, usize),
    },

    // === IPC/IO errors (skip this source this tick) ===
    #[error("io error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt cache/mask file '{0}'")]
    CorruptArtifact(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl FusionError {
    /// Whether this error kind is fatal and should abort process startup
    /// or a running process, per the design's error policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FusionError::UnknownResolver(_)
                | FusionError::UnknownTerrainModel(_)
                | FusionError::UnknownVolume(_)
                | FusionError::MissingDem { .. }
                | FusionError::InvalidGridSpec(_)
                | FusionError::MaskAllocationFailed { .. }
        )
    }
}

/// Helper to wrap a std::io::Error with the path that caused it.
pub fn io_error(path: impl Into<String>, source: std::io::Error) -> FusionError {
    FusionError::Io {
        path: path.into(),
        source,
    }
}
