//! Per-day forecast cache
//!
//! Each processing day owns at most one forecast artifact, persisted as
//! `forecast_<YYYY-MM-DD>.csv` in the cache directory. A day moves through
//! ABSENT -> COMPUTING -> PRESENT; the transition out of ABSENT happens under a
//! single lock, so only one caller per day ever runs the computation. Everyone
//! else either reads the present artifact or waits for the computing one.

use crate::error::{ForecastError, Result};
use crate::models::{ForecastArtifact, ForecastRecord};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How a lookup was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The day's artifact already existed
    Hit,
    /// This call ran the computation
    Computed,
}

/// Artifact returned by the cache, with how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub artifact: ForecastArtifact,
    pub outcome: CacheOutcome,
}

#[derive(Debug)]
enum Slot {
    Computing,
    Present(ForecastArtifact),
}

enum Claim {
    Ready(ForecastArtifact),
    Owner,
}

#[derive(Debug)]
struct CacheInner {
    dir: PathBuf,
    slots: Mutex<HashMap<NaiveDate, Slot>>,
    ready: Condvar,
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<NaiveDate, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Store of one forecast artifact per calendar day
#[derive(Debug, Clone)]
pub struct ForecastCache {
    inner: Arc<CacheInner>,
}

impl ForecastCache {
    /// Create a cache persisting artifacts under `dir`
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                dir: dir.as_ref().to_path_buf(),
                slots: Mutex::new(HashMap::new()),
                ready: Condvar::new(),
            }),
        }
    }

    /// Get the cache directory
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Path of the artifact file for `day`
    pub fn artifact_path(&self, day: NaiveDate) -> PathBuf {
        artifact_path(&self.inner.dir, day)
    }

    /// The artifact for `day`, if one has been produced
    pub fn get(&self, day: NaiveDate) -> Result<Option<ForecastArtifact>> {
        if let Some(Slot::Present(artifact)) = self.inner.lock().get(&day) {
            return Ok(Some(artifact.clone()));
        }
        read_artifact(&self.artifact_path(day))
    }

    /// Return the artifact for `day`, running `compute` only if none exists yet
    ///
    /// Concurrent callers for the same day block until the first caller's
    /// computation finishes. If it fails, the day returns to ABSENT and the next
    /// waiter takes over the computation.
    pub fn get_or_compute<F>(&self, day: NaiveDate, compute: F) -> Result<CacheLookup>
    where
        F: FnOnce() -> Result<ForecastArtifact>,
    {
        match self.claim(day, None)? {
            Claim::Ready(artifact) => {
                debug!(%day, "forecast cache hit");
                Ok(CacheLookup {
                    artifact,
                    outcome: CacheOutcome::Hit,
                })
            }
            Claim::Owner => {
                info!(%day, "forecast cache miss; computing");
                let guard = ComputeGuard::new(Arc::clone(&self.inner), day);
                let artifact = guard.complete(compute())?;
                Ok(CacheLookup {
                    artifact,
                    outcome: CacheOutcome::Computed,
                })
            }
        }
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but give up after `deadline`
    ///
    /// The computation runs on its own thread. When the deadline passes the
    /// caller gets [`ForecastError::ForecastTimeout`]; the computation keeps
    /// going and its result is cached for later callers.
    pub fn get_or_compute_within<F>(
        &self,
        day: NaiveDate,
        deadline: Duration,
        compute: F,
    ) -> Result<CacheLookup>
    where
        F: FnOnce() -> Result<ForecastArtifact> + Send + 'static,
    {
        let expires = Instant::now() + deadline;

        match self.claim(day, Some((expires, deadline)))? {
            Claim::Ready(artifact) => Ok(CacheLookup {
                artifact,
                outcome: CacheOutcome::Hit,
            }),
            Claim::Owner => {
                info!(%day, ?deadline, "forecast cache miss; computing in background");
                let guard = ComputeGuard::new(Arc::clone(&self.inner), day);
                let (tx, rx) = mpsc::channel();

                thread::Builder::new()
                    .name(format!("forecast-{}", day))
                    .spawn(move || {
                        let result = guard.complete(compute());
                        // The receiver is gone if the caller already timed out
                        let _ = tx.send(result);
                    })?;

                let remaining = expires.saturating_duration_since(Instant::now());
                match rx.recv_timeout(remaining) {
                    Ok(result) => result.map(|artifact| CacheLookup {
                        artifact,
                        outcome: CacheOutcome::Computed,
                    }),
                    Err(RecvTimeoutError::Timeout) => {
                        warn!(%day, ?deadline, "forecast not ready before deadline");
                        Err(ForecastError::ForecastTimeout(deadline))
                    }
                    Err(RecvTimeoutError::Disconnected) => Err(ForecastError::NoForecastAvailable(
                        format!("Forecast computation for {} ended without a result", day),
                    )),
                }
            }
        }
    }

    /// Take the day's artifact, or become the one caller allowed to compute it
    ///
    /// The artifact file is read without holding the slot lock; the slot is
    /// checked again afterwards in case another caller got there first.
    fn claim(&self, day: NaiveDate, deadline: Option<(Instant, Duration)>) -> Result<Claim> {
        let known = self.inner.lock().contains_key(&day);
        let mut on_disk = if known {
            None
        } else {
            read_artifact(&artifact_path(&self.inner.dir, day))?
        };

        let mut slots = self.inner.lock();
        loop {
            match slots.get(&day) {
                Some(Slot::Present(artifact)) => return Ok(Claim::Ready(artifact.clone())),
                Some(Slot::Computing) => {
                    debug!(%day, "waiting for in-flight forecast");
                    slots = match deadline {
                        None => self
                            .inner
                            .ready
                            .wait(slots)
                            .unwrap_or_else(PoisonError::into_inner),
                        Some((expires, total)) => {
                            let remaining = expires.saturating_duration_since(Instant::now());
                            if remaining.is_zero() {
                                return Err(ForecastError::ForecastTimeout(total));
                            }
                            self.inner
                                .ready
                                .wait_timeout(slots, remaining)
                                .unwrap_or_else(PoisonError::into_inner)
                                .0
                        }
                    };
                }
                None => {
                    if let Some(artifact) = on_disk.take() {
                        slots.insert(day, Slot::Present(artifact.clone()));
                        return Ok(Claim::Ready(artifact));
                    }
                    slots.insert(day, Slot::Computing);
                    return Ok(Claim::Owner);
                }
            }
        }
    }
}

/// Ownership of a day in the COMPUTING state
///
/// Dropping the guard without completing it (for example when the
/// computation panics) returns the day to ABSENT and wakes the waiters.
struct ComputeGuard {
    inner: Arc<CacheInner>,
    day: NaiveDate,
    armed: bool,
}

impl ComputeGuard {
    fn new(inner: Arc<CacheInner>, day: NaiveDate) -> Self {
        Self {
            inner,
            day,
            armed: true,
        }
    }

    fn complete(mut self, result: Result<ForecastArtifact>) -> Result<ForecastArtifact> {
        let persisted = result.and_then(|artifact| {
            write_artifact(&artifact_path(&self.inner.dir, self.day), &artifact)?;
            Ok(artifact)
        });

        let mut slots = self.inner.lock();
        match &persisted {
            Ok(artifact) => {
                slots.insert(self.day, Slot::Present(artifact.clone()));
                info!(day = %self.day, days = artifact.len(), "forecast cached");
            }
            Err(e) => {
                slots.remove(&self.day);
                warn!(day = %self.day, error = %e, "forecast computation failed");
            }
        }
        self.armed = false;
        drop(slots);
        self.inner.ready.notify_all();

        persisted
    }
}

impl Drop for ComputeGuard {
    fn drop(&mut self) {
        if self.armed {
            self.inner.lock().remove(&self.day);
            self.inner.ready.notify_all();
        }
    }
}

fn artifact_path(dir: &Path, day: NaiveDate) -> PathBuf {
    dir.join(format!("forecast_{}.csv", day.format("%Y-%m-%d")))
}

/// Read a persisted forecast; `Ok(None)` when the file does not exist
pub fn read_artifact(path: &Path) -> Result<Option<ForecastArtifact>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize::<ForecastRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            ForecastError::SchemaInvalid(format!(
                "Cannot read forecast file {}: {}",
                path.display(),
                e
            ))
        })?;

    ForecastArtifact::new(records).map(Some)
}

/// Persist a forecast, replacing any file at `path` in one rename
pub fn write_artifact(path: &Path, artifact: &ForecastArtifact) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        for record in artifact.records() {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;

    Ok(())
}
