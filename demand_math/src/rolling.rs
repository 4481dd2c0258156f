//! Trailing window calculations
//!
//! Contains the rolling aggregates used by replenishment planning:
//! - Rolling Sum (partial windows allowed while the window fills)
//! - Trailing sums over a whole series
//! - Arithmetic mean

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Rolling sum over the most recent `window` values
///
/// Unlike a moving average this reports a value as soon as one observation
/// has been seen: while the window is still filling it sums what exists.
#[derive(Debug, Clone)]
pub struct RollingSum {
    window: usize,
    values: VecDeque<f64>,
}

impl RollingSum {
    /// Create a new Rolling Sum with the specified window
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(MathError::InvalidInput(
                "Window must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            window,
            values: VecDeque::with_capacity(window),
        })
    }

    /// Push a new value, evicting the oldest one once the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        if self.values.len() > self.window {
            self.values.pop_front();
        }
    }

    /// Get the current sum
    ///
    /// Recomputed from the window contents so long series never accumulate
    /// add/subtract drift.
    pub fn value(&self) -> Result<f64> {
        if self.values.is_empty() {
            return Err(MathError::InsufficientData(
                "No values in rolling window".to_string(),
            ));
        }

        Ok(self.values.iter().sum())
    }

    /// Whether the window holds `window` values
    pub fn is_full(&self) -> bool {
        self.values.len() == self.window
    }

    /// Get the window length
    pub fn window(&self) -> usize {
        self.window
    }

    /// Reset the Rolling Sum, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

/// Trailing sums of `values`, one per element
///
/// Element `i` is the sum of `values[i + 1 - window ..= i]`, clamped at the
/// start of the series.
pub fn trailing_sums(values: &[f64], window: usize) -> Result<Vec<f64>> {
    let mut rolling = RollingSum::new(window)?;
    let mut sums = Vec::with_capacity(values.len());

    for &value in values {
        rolling.update(value);
        sums.push(rolling.value()?);
    }

    Ok(sums)
}

/// Arithmetic mean of `values`
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty series".to_string(),
        ));
    }

    Ok(values.iter().sum::<f64>() / values.len() as f64)
}
