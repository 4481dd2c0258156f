//! # Demand Forecast
//!
//! Daily demand forecasting and inventory replenishment for a single
//! product/store history.
//!
//! ## Features
//!
//! - Demand history loading, validation and normalisation (`Demand_Trends.csv`)
//! - Seasonal ARIMA forecasting, SARIMA(2,1,2)(1,1,1)[7] by default
//! - A per-day forecast cache that fits the model at most once per day, even
//!   under concurrent requests
//! - Folding the day's own prediction back into the history after a cutoff hour
//! - Safety stock, reorder points and order quantities from a forecast
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::Local;
//! use demand_forecast::{EngineConfig, ReplenishmentEngine};
//!
//! let engine = ReplenishmentEngine::from_config(&EngineConfig::default())?;
//! let now = Local::now().naive_local();
//!
//! // Next week's demand; the model is fitted on the first call of the day only
//! let forecast = engine.get_forecast(now, 7)?;
//! for record in forecast.records() {
//!     println!("{} {:.2}", record.date, record.predicted_demand);
//! }
//!
//! let plan = engine.get_optimization(now, engine.replenishment_config())?;
//! println!("order today: {:.2}", plan.order_today);
//! # Ok::<(), demand_forecast::ForecastError>(())
//! ```

pub mod cache;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod optimization;
pub mod updater;

// Re-export commonly used types
pub use crate::cache::{CacheLookup, CacheOutcome, ForecastCache};
pub use crate::config::EngineConfig;
pub use crate::data::{DemandRecord, DemandSeries, TimeSeriesStore};
pub use crate::engine::ReplenishmentEngine;
pub use crate::error::{ErrorKind, ForecastError, Result};
pub use crate::models::{
    DemandForecaster, ForecastAnchor, ForecastArtifact, ForecastRecord, SarimaForecaster,
};
pub use crate::optimization::{
    OptimizationResult, ReplenishmentConfig, ReplenishmentDay, ReplenishmentOptimizer,
};
pub use crate::updater::{HistoryUpdater, UpdateOutcome};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
