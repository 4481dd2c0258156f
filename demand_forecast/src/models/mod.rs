//! Forecast artifacts and the forecasting model interface

use crate::data::DemandRecord;
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// One forecasted day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub predicted_demand: f64,
}

/// A fixed-horizon daily forecast
///
/// Always non-empty, with strictly increasing dates exactly one day apart and
/// finite predictions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ForecastArtifact {
    records: Vec<ForecastRecord>,
}

impl ForecastArtifact {
    /// Create an artifact, checking that the records form a contiguous daily run
    pub fn new(records: Vec<ForecastRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(ForecastError::NoForecastAvailable(
                "Forecast contains no records".to_string(),
            ));
        }

        for pair in records.windows(2) {
            if pair[1].date != pair[0].date + Duration::days(1) {
                return Err(ForecastError::SchemaInvalid(format!(
                    "Forecast dates are not contiguous: {} is followed by {}",
                    pair[0].date, pair[1].date
                )));
            }
        }

        if let Some(bad) = records.iter().find(|r| !r.predicted_demand.is_finite()) {
            return Err(ForecastError::SchemaInvalid(format!(
                "Forecast for {} is not a finite number",
                bad.date
            )));
        }

        Ok(Self { records })
    }

    /// Create an artifact of consecutive days beginning at `start`
    pub fn from_values(start: NaiveDate, values: &[f64]) -> Result<Self> {
        let records = values
            .iter()
            .enumerate()
            .map(|(i, &predicted_demand)| ForecastRecord {
                date: start + Duration::days(i as i64),
                predicted_demand,
            })
            .collect();

        Self::new(records)
    }

    /// Get the forecast records
    pub fn records(&self) -> &[ForecastRecord] {
        &self.records
    }

    /// Get the number of forecasted days
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First forecasted date
    pub fn start_date(&self) -> NaiveDate {
        self.records[0].date
    }

    /// Last forecasted date
    pub fn end_date(&self) -> NaiveDate {
        self.records[self.records.len() - 1].date
    }

    /// Predicted demand for `date`, if it falls inside the horizon
    pub fn prediction_for(&self, date: NaiveDate) -> Option<f64> {
        let offset = (date - self.start_date()).num_days();
        if offset < 0 {
            return None;
        }
        self.records
            .get(offset as usize)
            .map(|record| record.predicted_demand)
    }

    /// The predicted values in date order
    pub fn predicted_demand(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.predicted_demand).collect()
    }

    /// The first `horizon` days of this forecast
    pub fn truncated(&self, horizon: usize) -> Result<Self> {
        if horizon == 0 || horizon > self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Requested horizon {} outside the available 1..={} days",
                horizon,
                self.len()
            )));
        }

        Ok(Self {
            records: self.records[..horizon].to_vec(),
        })
    }
}

/// Where the first forecast date sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastAnchor {
    /// The processing day
    #[default]
    Today,
    /// The day after the last historical record
    AfterHistory,
}

impl ForecastAnchor {
    /// First forecast date for a history ending on `last_history_date`
    pub fn start_date(self, last_history_date: NaiveDate, today: NaiveDate) -> NaiveDate {
        match self {
            ForecastAnchor::Today => today,
            ForecastAnchor::AfterHistory => last_history_date + Duration::days(1),
        }
    }
}

impl std::str::FromStr for ForecastAnchor {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "today" => Ok(ForecastAnchor::Today),
            "after_history" => Ok(ForecastAnchor::AfterHistory),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown forecast anchor '{}', expected 'today' or 'after_history'",
                other
            ))),
        }
    }
}

/// A model that turns demand history into a daily forecast
pub trait DemandForecaster: Debug + Send + Sync {
    /// Fit to `history` (one record per day, ascending) and forecast `horizon` days
    fn fit_and_forecast(
        &self,
        history: &[DemandRecord],
        horizon: usize,
        today: NaiveDate,
    ) -> Result<ForecastArtifact>;

    /// Name of the model
    fn name(&self) -> &str;
}

pub mod sarima;

pub use sarima::SarimaForecaster;
