//! Error types for the demand_forecast crate

use demand_math::MathError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Custom error types for the demand_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The historical series or a persisted artifact could not be found
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Required columns are missing or a row cannot be interpreted
    #[error("Schema invalid: {0}")]
    SchemaInvalid(String),

    /// The demand column has no usable values
    #[error("Empty series: {0}")]
    EmptySeries(String),

    /// Too few usable demand points to fit a model
    #[error("Insufficient history: need at least {required} demand points, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    /// Model estimation failed or did not converge
    #[error("Model fit failed: {0}")]
    ModelFitFailed(#[source] MathError),

    /// There is no forecast to work from
    #[error("No forecast available: {0}")]
    NoForecastAvailable(String),

    /// The caller's deadline passed before the forecast was ready
    #[error("Forecast not ready within {0:?}")]
    ForecastTimeout(Duration),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error in engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Stable identifier for each error family, reported at the serving boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DataUnavailable,
    SchemaInvalid,
    EmptySeries,
    InsufficientHistory,
    ModelFitFailed,
    NoForecastAvailable,
    ForecastTimeout,
    InvalidParameter,
    Config,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DataUnavailable => "data_unavailable",
            ErrorKind::SchemaInvalid => "schema_invalid",
            ErrorKind::EmptySeries => "empty_series",
            ErrorKind::InsufficientHistory => "insufficient_history",
            ErrorKind::ModelFitFailed => "model_fit_failed",
            ErrorKind::NoForecastAvailable => "no_forecast_available",
            ErrorKind::ForecastTimeout => "forecast_timeout",
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ForecastError {
    /// The stable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForecastError::DataUnavailable(_) => ErrorKind::DataUnavailable,
            ForecastError::SchemaInvalid(_) => ErrorKind::SchemaInvalid,
            ForecastError::EmptySeries(_) => ErrorKind::EmptySeries,
            ForecastError::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            ForecastError::ModelFitFailed(_) => ErrorKind::ModelFitFailed,
            ForecastError::NoForecastAvailable(_) => ErrorKind::NoForecastAvailable,
            ForecastError::ForecastTimeout(_) => ErrorKind::ForecastTimeout,
            ForecastError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            ForecastError::Config(_) => ErrorKind::Config,
            ForecastError::Io(_) | ForecastError::Csv(_) => ErrorKind::Io,
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
