//! # Aura Inventory
//!
//! `aura_inventory` bundles the demand forecasting and replenishment crates:
//!
//! - [`math`]: differencing, rolling sums, the seasonal ARIMA estimator and
//!   service-level helpers (`demand_math`)
//! - [`forecast`]: the history store, per-day forecast cache, history updater
//!   and replenishment optimizer (`demand_forecast`)
//!
//! ## Example
//!
//! ```
//! use aura_inventory::ReplenishmentConfig;
//!
//! let config = ReplenishmentConfig::default();
//! assert_eq!(config.lead_time_days, 7);
//! assert_eq!(config.cover_days, 14);
//! ```

pub use demand_forecast as forecast;
pub use demand_math as math;

pub use demand_forecast::{
    EngineConfig, ErrorKind, ForecastArtifact, ForecastError, OptimizationResult,
    ReplenishmentConfig, ReplenishmentEngine,
};

/// Crate version shared by the workspace members
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
