use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("DEM grid has no data at ({lat}, {lon})")]
    OutOfBounds { lat: f64, lon: f64 },

    #[error("unknown terrain model: {0}")]
    UnknownModel(String),
}

pub type TerrainResult<T> = std::result::Result<T, TerrainError>;
