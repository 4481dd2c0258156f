//! Replenishment planning from a demand forecast
//!
//! Derives safety stock, rolling lead-time demand, reorder points and order
//! quantities from a [`ForecastArtifact`]. All arithmetic is done at full
//! precision; [`OptimizationResult::rounded`] is for presentation only.

use crate::error::{ForecastError, Result};
use crate::models::ForecastArtifact;
use chrono::NaiveDate;
use demand_math::rolling::{mean, trailing_sums};
use demand_math::service_level::{safety_stock, z_score};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Decimal places used when results are presented
pub const PRESENTATION_PLACES: u32 = 2;

/// Replenishment policy parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplenishmentConfig {
    /// Days between placing an order and receiving it
    pub lead_time_days: usize,
    /// Estimate of the forecast's root mean squared error
    pub forecast_rmse: f64,
    /// Target probability of not stocking out during the lead time
    pub service_level: f64,
    /// Days of average demand one order should cover
    pub cover_days: usize,
}

impl Default for ReplenishmentConfig {
    fn default() -> Self {
        Self {
            lead_time_days: 7,
            forecast_rmse: 25.85,
            service_level: 0.95,
            cover_days: 14,
        }
    }
}

impl ReplenishmentConfig {
    /// Check every parameter, reporting all problems at once
    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();

        if self.lead_time_days == 0 {
            issues.push("lead_time_days must be > 0".to_string());
        }
        if !(self.forecast_rmse >= 0.0 && self.forecast_rmse.is_finite()) {
            issues.push("forecast_rmse must be a finite number >= 0".to_string());
        }
        if !(self.service_level > 0.0 && self.service_level < 1.0) {
            issues.push("service_level must be strictly between 0 and 1".to_string());
        }
        if self.cover_days == 0 {
            issues.push("cover_days must be > 0".to_string());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ForecastError::InvalidParameter(issues.join("; ")))
        }
    }
}

/// One forecast day annotated with its replenishment figures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentDay {
    pub date: NaiveDate,
    pub predicted_demand: f64,
    /// Predicted demand over the lead-time window ending on this day
    pub lead_time_demand: f64,
    /// Inventory level at which to reorder on this day
    pub reorder_point: f64,
}

/// Replenishment recommendation derived from a forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub z_score: f64,
    pub safety_stock: f64,
    pub average_daily_demand: f64,
    pub order_quantity: f64,
    /// Demand over the first lead time plus safety stock
    pub order_today: f64,
    pub lead_time_days: usize,
    pub days: Vec<ReplenishmentDay>,
}

impl OptimizationResult {
    /// Copy with every quantity rounded to `places` decimals
    pub fn rounded(&self, places: u32) -> Self {
        let r = |v: f64| round_to(v, places);

        Self {
            z_score: r(self.z_score),
            safety_stock: r(self.safety_stock),
            average_daily_demand: r(self.average_daily_demand),
            order_quantity: r(self.order_quantity),
            order_today: r(self.order_today),
            lead_time_days: self.lead_time_days,
            days: self
                .days
                .iter()
                .map(|day| ReplenishmentDay {
                    date: day.date,
                    predicted_demand: r(day.predicted_demand),
                    lead_time_demand: r(day.lead_time_demand),
                    reorder_point: r(day.reorder_point),
                })
                .collect(),
        }
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}

/// Compute the replenishment plan for `artifact`
pub fn optimize(artifact: &ForecastArtifact, config: &ReplenishmentConfig) -> Result<OptimizationResult> {
    if artifact.is_empty() {
        return Err(ForecastError::NoForecastAvailable(
            "Cannot optimise an empty forecast".to_string(),
        ));
    }
    config.validate()?;

    let invalid = |e: demand_math::MathError| ForecastError::InvalidParameter(e.to_string());
    let z = z_score(config.service_level).map_err(invalid)?;
    let safety = safety_stock(z, config.forecast_rmse, config.lead_time_days).map_err(invalid)?;

    let predicted = artifact.predicted_demand();
    let lead_time_demand = trailing_sums(&predicted, config.lead_time_days).map_err(invalid)?;
    let average_daily_demand = mean(&predicted).map_err(invalid)?;

    let lead_window = config.lead_time_days.min(predicted.len());
    let order_today = predicted[..lead_window].iter().sum::<f64>() + safety;

    let days = artifact
        .records()
        .iter()
        .zip(lead_time_demand)
        .map(|(record, lead_time_demand)| ReplenishmentDay {
            date: record.date,
            predicted_demand: record.predicted_demand,
            lead_time_demand,
            reorder_point: lead_time_demand + safety,
        })
        .collect();

    Ok(OptimizationResult {
        z_score: z,
        safety_stock: safety,
        average_daily_demand,
        order_quantity: average_daily_demand * config.cover_days as f64,
        order_today,
        lead_time_days: config.lead_time_days,
        days,
    })
}

/// Runs [`optimize`] and keeps an annotated copy of the forecast per day
#[derive(Debug, Clone)]
pub struct ReplenishmentOptimizer {
    dir: PathBuf,
}

impl ReplenishmentOptimizer {
    /// Create an optimizer writing annotated forecasts under `dir`
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the annotated forecast for `day`
    pub fn annotated_path(&self, day: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("optimization_{}.csv", day.format("%Y-%m-%d")))
    }

    /// Optimise `artifact` and persist the per-day columns for `day`
    pub fn optimize(
        &self,
        day: NaiveDate,
        artifact: &ForecastArtifact,
        config: &ReplenishmentConfig,
    ) -> Result<OptimizationResult> {
        let result = optimize(artifact, config)?;
        let path = self.annotated_path(day);
        write_annotated(&path, &result)?;

        info!(
            %day,
            safety_stock = result.safety_stock,
            order_today = result.order_today,
            order_quantity = result.order_quantity,
            path = %path.display(),
            "replenishment plan computed"
        );
        Ok(result)
    }
}

/// Write the annotated forecast rows to `path`
pub fn write_annotated(path: &Path, result: &OptimizationResult) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for day in &result.days {
        writer.serialize(day)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read annotated forecast rows written by [`write_annotated`]
pub fn read_annotated(path: &Path) -> Result<Vec<ReplenishmentDay>> {
    if !path.exists() {
        return Err(ForecastError::DataUnavailable(format!(
            "Annotated forecast not found: {}",
            path.display()
        )));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let days = reader
        .deserialize()
        .collect::<std::result::Result<Vec<ReplenishmentDay>, _>>()?;
    Ok(days)
}
