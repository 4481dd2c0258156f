//! Seasonal ARIMA demand forecaster

use crate::data::DemandRecord;
use crate::error::{ForecastError, Result};
use crate::models::{DemandForecaster, ForecastAnchor, ForecastArtifact};
use chrono::NaiveDate;
use demand_math::optimize::NelderMead;
use demand_math::{ArimaOrder, SarimaModel, SeasonalOrder};
use std::time::Instant;
use tracing::{debug, info};

/// Forecaster backed by a SARIMA(p,d,q)(P,D,Q)[s] model
#[derive(Debug, Clone)]
pub struct SarimaForecaster {
    model: SarimaModel,
    anchor: ForecastAnchor,
}

impl Default for SarimaForecaster {
    /// SARIMA(2,1,2)(1,1,1)[7] anchored at the processing day
    fn default() -> Self {
        Self::new(
            ArimaOrder::default(),
            SeasonalOrder::default(),
            ForecastAnchor::default(),
        )
        .expect("default SARIMA orders are valid")
    }
}

impl SarimaForecaster {
    /// Create a new forecaster
    pub fn new(order: ArimaOrder, seasonal: SeasonalOrder, anchor: ForecastAnchor) -> Result<Self> {
        let model = SarimaModel::new(order, seasonal)
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;

        Ok(Self { model, anchor })
    }

    /// Set the estimation budget
    pub fn with_estimation(mut self, max_iterations: usize, tolerance: f64) -> Result<Self> {
        let optimizer = NelderMead::new(max_iterations, tolerance)
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
        self.model = self.model.with_optimizer(optimizer);
        Ok(self)
    }

    pub fn anchor(&self) -> ForecastAnchor {
        self.anchor
    }

    /// Smallest history the model can be fitted to
    pub fn min_observations(&self) -> usize {
        self.model.min_observations()
    }
}

impl DemandForecaster for SarimaForecaster {
    fn fit_and_forecast(
        &self,
        history: &[DemandRecord],
        horizon: usize,
        today: NaiveDate,
    ) -> Result<ForecastArtifact> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be at least one day".to_string(),
            ));
        }
        let last = history.last().ok_or(ForecastError::InsufficientHistory {
            required: self.min_observations(),
            available: 0,
        })?;
        if history.len() < self.min_observations() {
            return Err(ForecastError::InsufficientHistory {
                required: self.min_observations(),
                available: history.len(),
            });
        }

        let demand: Vec<f64> = history.iter().map(|r| r.demand).collect();
        let started = Instant::now();
        debug!(model = self.model.name(), observations = demand.len(), horizon, "fitting model");

        let fitted = self
            .model
            .fit(&demand)
            .map_err(ForecastError::ModelFitFailed)?;
        let raw = fitted
            .forecast(horizon)
            .map_err(ForecastError::ModelFitFailed)?;

        // Demand cannot go below zero, whatever the fitted drift says
        let clamped = raw.iter().filter(|v| **v < 0.0).count();
        let values: Vec<f64> = raw.into_iter().map(|v| v.max(0.0)).collect();
        if clamped > 0 {
            debug!(clamped, horizon, "negative predictions clamped to zero");
        }

        info!(
            model = fitted.name(),
            observations = demand.len(),
            horizon,
            iterations = fitted.iterations(),
            residual_rmse = fitted.residual_rmse(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model fitted"
        );

        let start = self.anchor.start_date(last.date, today);
        ForecastArtifact::from_values(start, &values)
    }

    fn name(&self) -> &str {
        self.model.name()
    }
}
