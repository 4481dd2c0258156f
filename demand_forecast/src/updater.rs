//! Folding the day's own forecast back into the demand history

use crate::data::{DemandRecord, TimeSeriesStore};
use crate::error::{ForecastError, Result};
use crate::models::ForecastArtifact;
use chrono::{NaiveDateTime, NaiveTime};
use tracing::{debug, info};

/// Default time of day after which today's prediction is recorded
pub const DEFAULT_CUTOFF_HOUR: u32 = 12;

/// What a call to [`HistoryUpdater::maybe_update`] did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    /// It is still before the cutoff time
    BeforeCutoff,
    /// The history already has a row for today
    AlreadyRecorded,
    /// The forecast does not cover today
    NoForecastForToday,
    /// A synthetic record for today was appended
    Appended(DemandRecord),
}

/// Extends the history with today's predicted demand, at most once per day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryUpdater {
    cutoff: NaiveTime,
}

impl Default for HistoryUpdater {
    fn default() -> Self {
        Self {
            cutoff: NaiveTime::from_hms_opt(DEFAULT_CUTOFF_HOUR, 0, 0).unwrap_or_default(),
        }
    }
}

impl HistoryUpdater {
    /// Create an updater that acts from `cutoff_hour`:00 onwards
    pub fn new(cutoff_hour: u32) -> Result<Self> {
        let cutoff = NaiveTime::from_hms_opt(cutoff_hour, 0, 0).ok_or_else(|| {
            ForecastError::InvalidParameter(format!(
                "Cutoff hour must be between 0 and 23, got {}",
                cutoff_hour
            ))
        })?;

        Ok(Self { cutoff })
    }

    pub fn cutoff(&self) -> NaiveTime {
        self.cutoff
    }

    /// Append today's prediction to the history if the cutoff has passed and
    /// today is not recorded yet
    ///
    /// The "already recorded" check is made against the history file itself,
    /// so repeated calls, including calls from a restarted process, append at
    /// most one row per day.
    pub fn maybe_update(
        &self,
        store: &TimeSeriesStore,
        now: NaiveDateTime,
        artifact: &ForecastArtifact,
    ) -> Result<UpdateOutcome> {
        if now.time() < self.cutoff {
            debug!(%now, cutoff = %self.cutoff, "before cutoff; history left unchanged");
            return Ok(UpdateOutcome::BeforeCutoff);
        }

        let today = now.date();
        let series = store.load()?;
        if series.contains_date(today) {
            debug!(%today, "history already has today's row");
            return Ok(UpdateOutcome::AlreadyRecorded);
        }

        let Some(predicted) = artifact.prediction_for(today) else {
            info!(
                %today,
                start = %artifact.start_date(),
                end = %artifact.end_date(),
                "forecast does not cover today; history left unchanged"
            );
            return Ok(UpdateOutcome::NoForecastForToday);
        };

        let record = DemandRecord {
            date: today,
            demand: predicted,
            inventory: series.latest_inventory(),
        };

        if store.append(&record)? {
            Ok(UpdateOutcome::Appended(record))
        } else {
            Ok(UpdateOutcome::AlreadyRecorded)
        }
    }
}
