use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Geometry error: {0}")]
    GeoError(#[from] latamconn_geo::GeoError),

    #[error("Missing column '{0}' in input table")]
    MissingColumn(String),

    #[error("Matrix shape mismatch: {0}")]
    MatrixShape(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid country registry: {0}")]
    Registry(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
