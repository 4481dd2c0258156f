//! # Demand Math
//!
//! Numerical building blocks for demand forecasting and inventory replenishment.
//! This crate has no I/O: it works on plain `f64` slices and provides
//! differencing, trailing window sums, a simplex minimiser, a seasonal ARIMA
//! estimator and the service-level helpers used to size safety stock.

use thiserror::Error;

pub mod differencing;
pub mod optimize;
pub mod rolling;
pub mod sarima;
pub mod service_level;

pub use sarima::{ArimaOrder, FittedSarima, SarimaModel, SeasonalOrder};

/// Errors that can occur in demand-related calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for demand math operations
pub type Result<T> = std::result::Result<T, MathError>;
