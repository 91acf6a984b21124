//! Error types for vadose

use thiserror::Error;

/// Main error type for vadose operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("GeoTIFF error: {0}")]
    Geotiff(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("Field '{field}' missing on feature {feature}")]
    MissingField { field: String, feature: usize },

    #[error("Field '{field}' on feature {feature} is not numeric")]
    NonNumericField { field: String, feature: usize },

    #[error("Layer '{0}' contains no features")]
    EmptyLayer(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for vadose operations
pub type Result<T> = std::result::Result<T, Error>;
