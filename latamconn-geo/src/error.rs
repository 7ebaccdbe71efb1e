use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Invalid arc style: {0}")]
    InvalidStyle(String),

    #[error("Invalid centroid table: {0}")]
    InvalidCentroids(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GeoError>;
