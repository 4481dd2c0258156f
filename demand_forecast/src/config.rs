//! Engine configuration, loaded from TOML
//!
//! Every field has a default, so an empty file (or no file) yields a working
//! configuration:
//!
//! ```toml
//! [paths]
//! history_file = "Demand_Trends.csv"
//! artifact_dir = "."
//!
//! [forecast]
//! horizon_days = 90
//! anchor = "today"          # or "after_history"
//! cutoff_hour = 12
//! order = { p = 2, d = 1, q = 2 }
//! seasonal_order = { p = 1, d = 1, q = 1, period = 7 }
//!
//! [replenishment]
//! lead_time_days = 7
//! forecast_rmse = 25.85
//! service_level = 0.95
//! cover_days = 14
//! ```

use crate::data::DEFAULT_MIN_HISTORY;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastAnchor, SarimaForecaster};
use crate::optimization::ReplenishmentConfig;
use crate::updater::DEFAULT_CUTOFF_HOUR;
use demand_math::{ArimaOrder, SeasonalOrder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the history and the daily artifacts live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub history_file: PathBuf,
    pub artifact_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            history_file: PathBuf::from("Demand_Trends.csv"),
            artifact_dir: PathBuf::from("."),
        }
    }
}

/// Forecast model and scheduling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Days forecast once per processing day
    pub horizon_days: usize,
    pub anchor: ForecastAnchor,
    /// Hour of day from which today's prediction is folded into the history
    pub cutoff_hour: u32,
    /// Fewest daily demand points a forecast may be fitted to
    pub min_history: usize,
    pub order: ArimaOrder,
    pub seasonal_order: SeasonalOrder,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: 90,
            anchor: ForecastAnchor::default(),
            cutoff_hour: DEFAULT_CUTOFF_HOUR,
            min_history: DEFAULT_MIN_HISTORY,
            order: ArimaOrder::default(),
            seasonal_order: SeasonalOrder::default(),
            max_iterations: 4000,
            tolerance: 1e-8,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub paths: PathsConfig,
    pub forecast: ForecastConfig,
    pub replenishment: ReplenishmentConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(raw).map_err(|e| ForecastError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ForecastError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Check every setting, reporting all problems in one error
    pub fn validate(&self) -> Result<()> {
        let mut issues: Vec<String> = Vec::new();
        let forecast = &self.forecast;

        if forecast.horizon_days == 0 {
            issues.push("forecast.horizon_days must be > 0".into());
        }
        if forecast.cutoff_hour > 23 {
            issues.push("forecast.cutoff_hour must be between 0 and 23".into());
        }
        if forecast.min_history == 0 {
            issues.push("forecast.min_history must be > 0".into());
        }
        if forecast.seasonal_order.period < 2 {
            issues.push("forecast.seasonal_order.period must be >= 2".into());
        }
        if forecast.max_iterations == 0 {
            issues.push("forecast.max_iterations must be > 0".into());
        }
        if !(forecast.tolerance > 0.0) {
            issues.push("forecast.tolerance must be > 0".into());
        }

        if let Err(ForecastError::InvalidParameter(msg)) = self.replenishment.validate() {
            issues.extend(msg.split("; ").map(|m| format!("replenishment.{}", m)));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ForecastError::Config(issues.join("; ")))
        }
    }

    /// Build the forecaster these settings describe
    pub fn forecaster(&self) -> Result<SarimaForecaster> {
        SarimaForecaster::new(
            self.forecast.order,
            self.forecast.seasonal_order,
            self.forecast.anchor,
        )?
        .with_estimation(self.forecast.max_iterations, self.forecast.tolerance)
    }
}
