//! Forecast and replenishment entry points
//!
//! [`ReplenishmentEngine`] ties the pieces together:
//!
//! - `get_forecast` consults the day's cache entry; on a miss it loads and
//!   normalises the history, fits the forecaster and caches the artifact.
//! - every request that obtains the day's artifact then gives the
//!   [`HistoryUpdater`] a chance to record today's prediction.
//! - `get_optimization` runs the replenishment optimizer over the day's
//!   artifact, generating it first if needed.
//!
//! The current time is always passed in by the caller.

use crate::cache::{CacheOutcome, ForecastCache};
use crate::config::EngineConfig;
use crate::data::TimeSeriesStore;
use crate::error::{ForecastError, Result};
use crate::models::{DemandForecaster, ForecastArtifact, SarimaForecaster};
use crate::optimization::{OptimizationResult, ReplenishmentConfig, ReplenishmentOptimizer};
use crate::updater::{HistoryUpdater, UpdateOutcome};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Default number of days forecast per processing day
pub const DEFAULT_HORIZON_DAYS: usize = 90;

/// Forecast cache and replenishment engine for one product/store history
#[derive(Debug)]
pub struct ReplenishmentEngine<F: DemandForecaster = SarimaForecaster> {
    store: Arc<TimeSeriesStore>,
    cache: ForecastCache,
    forecaster: Arc<F>,
    updater: HistoryUpdater,
    optimizer: ReplenishmentOptimizer,
    horizon_days: usize,
    replenishment: ReplenishmentConfig,
}

impl ReplenishmentEngine<SarimaForecaster> {
    /// Build an engine from validated configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        let store = TimeSeriesStore::new(&config.paths.history_file)
            .with_min_history(config.forecast.min_history);
        let cache = ForecastCache::new(&config.paths.artifact_dir);

        Ok(Self::new(store, cache, config.forecaster()?)
            .with_updater(HistoryUpdater::new(config.forecast.cutoff_hour)?)
            .with_horizon(config.forecast.horizon_days)
            .with_replenishment(config.replenishment))
    }
}

impl<F: DemandForecaster + 'static> ReplenishmentEngine<F> {
    /// Create an engine; annotated optimisation files go next to the cached forecasts
    pub fn new(store: TimeSeriesStore, cache: ForecastCache, forecaster: F) -> Self {
        let optimizer = ReplenishmentOptimizer::new(cache.dir());

        Self {
            store: Arc::new(store),
            cache,
            forecaster: Arc::new(forecaster),
            updater: HistoryUpdater::default(),
            optimizer,
            horizon_days: DEFAULT_HORIZON_DAYS,
            replenishment: ReplenishmentConfig::default(),
        }
    }

    pub fn with_updater(mut self, updater: HistoryUpdater) -> Self {
        self.updater = updater;
        self
    }

    /// Set the number of days forecast once per processing day
    pub fn with_horizon(mut self, horizon_days: usize) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_replenishment(mut self, replenishment: ReplenishmentConfig) -> Self {
        self.replenishment = replenishment;
        self
    }

    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    pub fn cache(&self) -> &ForecastCache {
        &self.cache
    }

    pub fn forecaster(&self) -> &F {
        &self.forecaster
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_days
    }

    /// The configured replenishment policy
    pub fn replenishment_config(&self) -> &ReplenishmentConfig {
        &self.replenishment
    }

    /// Forecast for the next `horizon_days` days, computed at most once per day
    pub fn get_forecast(&self, now: NaiveDateTime, horizon_days: usize) -> Result<ForecastArtifact> {
        self.check_horizon(horizon_days)?;
        self.daily_forecast(now, None)?.truncated(horizon_days)
    }

    /// Like [`get_forecast`](Self::get_forecast), failing with
    /// [`ForecastError::ForecastTimeout`] if the forecast is not ready within
    /// `deadline`
    pub fn get_forecast_within(
        &self,
        now: NaiveDateTime,
        horizon_days: usize,
        deadline: Duration,
    ) -> Result<ForecastArtifact> {
        self.check_horizon(horizon_days)?;
        self.daily_forecast(now, Some(deadline))?
            .truncated(horizon_days)
    }

    /// Replenishment plan over the day's full forecast
    pub fn get_optimization(
        &self,
        now: NaiveDateTime,
        config: &ReplenishmentConfig,
    ) -> Result<OptimizationResult> {
        config.validate()?;
        let artifact = self.daily_forecast(now, None)?;
        self.optimizer.optimize(now.date(), &artifact, config)
    }

    fn check_horizon(&self, horizon_days: usize) -> Result<()> {
        if horizon_days == 0 || horizon_days > self.horizon_days {
            return Err(ForecastError::InvalidParameter(format!(
                "Horizon must be between 1 and {} days, got {}",
                self.horizon_days, horizon_days
            )));
        }
        Ok(())
    }

    fn daily_forecast(
        &self,
        now: NaiveDateTime,
        deadline: Option<Duration>,
    ) -> Result<ForecastArtifact> {
        let today = now.date();
        let job = self.compute_job(today);

        let lookup = match deadline {
            None => self.cache.get_or_compute(today, job)?,
            Some(deadline) => self.cache.get_or_compute_within(today, deadline, job)?,
        };
        if lookup.outcome == CacheOutcome::Computed {
            info!(%today, model = self.forecaster.name(), "forecast generated");
        }
        // A file left by a run with a shorter horizon cannot serve this one
        if lookup.artifact.len() < self.horizon_days {
            return Err(ForecastError::SchemaInvalid(format!(
                "Cached forecast for {} covers {} days, expected {}",
                today,
                lookup.artifact.len(),
                self.horizon_days
            )));
        }

        self.fold_into_history(now, &lookup.artifact);
        lookup.artifact.truncated(self.horizon_days)
    }

    fn compute_job(&self, today: NaiveDate) -> impl FnOnce() -> Result<ForecastArtifact> + Send + 'static {
        let store = Arc::clone(&self.store);
        let forecaster = Arc::clone(&self.forecaster);
        let horizon = self.horizon_days;

        move || {
            let history = store.load_history()?;
            let artifact = forecaster.fit_and_forecast(&history, horizon, today)?;
            if artifact.len() != horizon {
                return Err(ForecastError::SchemaInvalid(format!(
                    "{} returned {} days, expected {}",
                    forecaster.name(),
                    artifact.len(),
                    horizon
                )));
            }
            Ok(artifact)
        }
    }

    /// Give the updater its chance; failures are logged, never returned
    fn fold_into_history(&self, now: NaiveDateTime, artifact: &ForecastArtifact) {
        match self.updater.maybe_update(&self.store, now, artifact) {
            Ok(UpdateOutcome::Appended(record)) => {
                info!(date = %record.date, demand = record.demand, "history extended with today's prediction");
            }
            Ok(outcome) => debug!(?outcome, "history update skipped"),
            Err(e) => error!(error = %e, kind = %e.kind(), "failed to update demand history"),
        }
    }
}
