//! Differencing and integration of time series
//!
//! A differencing plan is an ordered list of lags. Regular differencing uses a
//! lag of one, seasonal differencing uses the seasonal period. Applying the
//! plan keeps every intermediate stage so forecasts made on the fully
//! differenced series can be integrated back to the original scale.

use crate::{MathError, Result};

/// Lag-`lag` difference: `out[t] = series[t + lag] - series[t]`
pub fn difference(series: &[f64], lag: usize) -> Result<Vec<f64>> {
    if lag == 0 {
        return Err(MathError::InvalidInput(
            "Differencing lag must be greater than zero".to_string(),
        ));
    }
    if series.len() <= lag {
        return Err(MathError::InsufficientData(format!(
            "Cannot difference {} values at lag {}",
            series.len(),
            lag
        )));
    }

    Ok(series
        .windows(lag + 1)
        .map(|w| w[lag] - w[0])
        .collect())
}

/// Undo one lag-`lag` difference for values that follow `history`
///
/// `history` is the undifferenced series the forecast continues, and
/// `differenced_forecast` holds forecasts of the lag-`lag` differences for the
/// steps after it.
pub fn integrate(history: &[f64], differenced_forecast: &[f64], lag: usize) -> Result<Vec<f64>> {
    if lag == 0 {
        return Err(MathError::InvalidInput(
            "Integration lag must be greater than zero".to_string(),
        ));
    }
    if history.len() < lag {
        return Err(MathError::InsufficientData(format!(
            "Integration at lag {} needs at least {} history values, have {}",
            lag,
            lag,
            history.len()
        )));
    }

    let mut extended = history.to_vec();
    for &delta in differenced_forecast {
        let base = extended[extended.len() - lag];
        extended.push(base + delta);
    }

    Ok(extended.split_off(history.len()))
}

/// Every stage produced while differencing a series
#[derive(Debug, Clone)]
pub struct DifferencedSeries {
    /// `stages[0]` is the input, `stages[i + 1]` is `stages[i]` differenced at `lags[i]`
    stages: Vec<Vec<f64>>,
    lags: Vec<usize>,
}

impl DifferencedSeries {
    /// Apply the differencing plan `lags` to `series`, in order
    pub fn new(series: &[f64], lags: &[usize]) -> Result<Self> {
        let mut stages = Vec::with_capacity(lags.len() + 1);
        stages.push(series.to_vec());

        for &lag in lags {
            let last = stages.last().map(Vec::as_slice).unwrap_or_default();
            let next = difference(last, lag)?;
            stages.push(next);
        }

        Ok(Self {
            stages,
            lags: lags.to_vec(),
        })
    }

    /// The fully differenced series
    pub fn stationary(&self) -> &[f64] {
        self.stages.last().map(Vec::as_slice).unwrap_or_default()
    }

    /// The differencing lags, in the order they were applied
    pub fn lags(&self) -> &[usize] {
        &self.lags
    }

    /// Map forecasts of the fully differenced series back to the original scale
    pub fn integrate(&self, forecast: &[f64]) -> Result<Vec<f64>> {
        let mut current = forecast.to_vec();

        for (stage, &lag) in self.stages.iter().zip(self.lags.iter()).rev() {
            current = integrate(stage, &current, lag)?;
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difference() {
        let d = difference(&[1.0, 3.0, 6.0, 10.0], 1).unwrap();
        assert_eq!(d, vec![2.0, 3.0, 4.0]);

        let d = difference(&[1.0, 2.0, 5.0, 7.0], 2).unwrap();
        assert_eq!(d, vec![4.0, 5.0]);

        assert!(difference(&[1.0], 1).is_err());
        assert!(difference(&[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn test_integrate_inverts_difference() {
        let history = [5.0, 7.0, 4.0];
        // Lag-1 differences of the continuation 6, 9
        let restored = integrate(&history, &[2.0, 3.0], 1).unwrap();
        assert_eq!(restored, vec![6.0, 9.0]);

        // Lag-2: each value builds on the one two steps back
        let restored = integrate(&history, &[1.0, 1.0, 1.0], 2).unwrap();
        assert_eq!(restored, vec![8.0, 5.0, 9.0]);
    }

    #[test]
    fn test_plan_round_trip_on_weekly_pattern() {
        let week = [10.0, 12.0, 14.0, 11.0, 9.0, 20.0, 22.0];
        let series: Vec<f64> = (0..4).flat_map(|_| week.iter().copied()).collect();

        let plan = DifferencedSeries::new(&series, &[1, 7]).unwrap();
        assert_eq!(plan.stationary().len(), series.len() - 8);
        assert!(plan.stationary().iter().all(|v| v.abs() < 1e-12));

        // A zero forecast of the differenced series continues the weekly pattern
        let restored = plan.integrate(&[0.0; 7]).unwrap();
        for (got, want) in restored.iter().zip(week.iter()) {
            assert!((got - want).abs() < 1e-9);
        }
    }
}
