//! Seasonal ARIMA models for daily demand series
//!
//! A SARIMA(p,d,q)(P,D,Q)[s] model is fitted in three steps:
//!
//! 1. The series is differenced `d` times at lag 1 and `D` times at lag `s`.
//! 2. A multiplicative seasonal ARMA is estimated on the differenced series by
//!    conditional sum of squares: pre-sample values and innovations are taken
//!    as zero and the mean squared innovation is minimised with Nelder-Mead.
//!    Coefficients are not constrained to the stationary or invertible region.
//! 3. Forecasts of the differenced series are integrated back to levels.

use crate::differencing::DifferencedSeries;
use crate::optimize::NelderMead;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-seasonal order (p, d, q)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// Autoregressive terms
    pub p: usize,
    /// Regular differences
    pub d: usize,
    /// Moving-average terms
    pub q: usize,
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 2, d: 1, q: 2 }
    }
}

/// Seasonal order (P, D, Q, s)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalOrder {
    /// Seasonal autoregressive terms
    pub p: usize,
    /// Seasonal differences
    pub d: usize,
    /// Seasonal moving-average terms
    pub q: usize,
    /// Observations per season
    pub period: usize,
}

impl Default for SeasonalOrder {
    /// Weekly seasonality for daily data
    fn default() -> Self {
        Self {
            p: 1,
            d: 1,
            q: 1,
            period: 7,
        }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

impl fmt::Display for SeasonalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})[{}]", self.p, self.d, self.q, self.period)
    }
}

/// Estimated coefficients, in the sign convention
/// `(1 - φ(B))(1 - Φ(B^s)) w_t = (1 + θ(B))(1 + Θ(B^s)) e_t`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SarimaCoefficients {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
}

impl SarimaCoefficients {
    fn from_params(params: &[f64], order: ArimaOrder, seasonal: SeasonalOrder) -> Self {
        let (ar, rest) = params.split_at(order.p);
        let (ma, rest) = rest.split_at(order.q);
        let (seasonal_ar, seasonal_ma) = rest.split_at(seasonal.p);

        Self {
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            seasonal_ar: seasonal_ar.to_vec(),
            seasonal_ma: seasonal_ma.to_vec(),
        }
    }

    /// Per-lag autoregressive weights of the expanded product polynomial;
    /// index 0 is lag 1
    fn ar_lag_weights(&self, period: usize) -> Vec<f64> {
        let product = multiply_seasonal(&self.ar, &self.seasonal_ar, period, -1.0);
        product.iter().skip(1).map(|c| -c).collect()
    }

    /// Per-lag moving-average weights of the expanded product polynomial;
    /// index 0 is lag 1
    fn ma_lag_weights(&self, period: usize) -> Vec<f64> {
        let product = multiply_seasonal(&self.ma, &self.seasonal_ma, period, 1.0);
        product.into_iter().skip(1).collect()
    }
}

/// Expand `(1 + sign·Σ c_i B^i)(1 + sign·Σ C_k B^{k·period})`
fn multiply_seasonal(regular: &[f64], seasonal: &[f64], period: usize, sign: f64) -> Vec<f64> {
    let mut base = vec![1.0];
    base.extend(regular.iter().map(|c| sign * c));

    let mut season = vec![0.0; seasonal.len() * period + 1];
    season[0] = 1.0;
    for (k, c) in seasonal.iter().enumerate() {
        season[(k + 1) * period] = sign * c;
    }

    let mut product = vec![0.0; base.len() + season.len() - 1];
    for (i, a) in base.iter().enumerate() {
        for (j, b) in season.iter().enumerate() {
            product[i + j] += a * b;
        }
    }
    product
}

/// One-step innovations of an ARMA recursion with zero pre-sample values
fn innovations(series: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut errors = Vec::with_capacity(series.len());

    for t in 0..series.len() {
        let predicted = arma_prediction(series, &errors, t, ar, ma);
        errors.push(series[t] - predicted);
    }

    errors
}

fn arma_prediction(values: &[f64], errors: &[f64], t: usize, ar: &[f64], ma: &[f64]) -> f64 {
    let ar_part: f64 = ar
        .iter()
        .enumerate()
        .take_while(|(i, _)| *i < t)
        .map(|(i, phi)| phi * values[t - 1 - i])
        .sum();
    let ma_part: f64 = ma
        .iter()
        .enumerate()
        .take_while(|(j, _)| *j < t)
        .map(|(j, theta)| theta * errors[t - 1 - j])
        .sum();

    ar_part + ma_part
}

/// SARIMA model before estimation
#[derive(Debug, Clone)]
pub struct SarimaModel {
    name: String,
    order: ArimaOrder,
    seasonal: SeasonalOrder,
    optimizer: NelderMead,
}

impl SarimaModel {
    /// Create a new SARIMA model
    pub fn new(order: ArimaOrder, seasonal: SeasonalOrder) -> Result<Self> {
        let has_seasonal_terms = seasonal.p + seasonal.d + seasonal.q > 0;
        if has_seasonal_terms && seasonal.period < 2 {
            return Err(MathError::InvalidInput(format!(
                "Seasonal period must be at least 2, got {}",
                seasonal.period
            )));
        }

        Ok(Self {
            name: format!("SARIMA{}{}", order, seasonal),
            order,
            seasonal,
            optimizer: NelderMead::default(),
        })
    }

    /// Replace the coefficient optimiser
    pub fn with_optimizer(mut self, optimizer: NelderMead) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Get the name of the model
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn seasonal_order(&self) -> SeasonalOrder {
        self.seasonal
    }

    /// Smallest series this model can be fitted to: every difference must
    /// leave at least two observations behind
    pub fn min_observations(&self) -> usize {
        self.order.d + self.seasonal.d * self.seasonal.period + 2
    }

    fn differencing_lags(&self) -> Vec<usize> {
        let mut lags = vec![1; self.order.d];
        lags.extend(std::iter::repeat(self.seasonal.period).take(self.seasonal.d));
        lags
    }

    fn parameter_count(&self) -> usize {
        self.order.p + self.order.q + self.seasonal.p + self.seasonal.q
    }

    /// Fit the model to `series`
    pub fn fit(&self, series: &[f64]) -> Result<FittedSarima> {
        if series.len() < self.min_observations() {
            return Err(MathError::InsufficientData(format!(
                "{} needs at least {} observations, have {}",
                self.name,
                self.min_observations(),
                series.len()
            )));
        }
        if let Some(pos) = series.iter().position(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(format!(
                "Series value at position {} is not finite",
                pos
            )));
        }

        let differenced = DifferencedSeries::new(series, &self.differencing_lags())?;
        let stationary = differenced.stationary();
        let period = self.seasonal.period;
        let (order, seasonal) = (self.order, self.seasonal);

        let objective = |params: &[f64]| {
            let coefficients = SarimaCoefficients::from_params(params, order, seasonal);
            let errors = innovations(
                stationary,
                &coefficients.ar_lag_weights(period),
                &coefficients.ma_lag_weights(period),
            );
            errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64
        };

        let (params, iterations) = if self.parameter_count() == 0 {
            (Vec::new(), 0)
        } else {
            let start = vec![0.0; self.parameter_count()];
            let minimum = self.optimizer.minimize(objective, &start)?;
            (minimum.point, minimum.iterations)
        };

        let coefficients = SarimaCoefficients::from_params(&params, order, seasonal);
        let ar_weights = coefficients.ar_lag_weights(period);
        let ma_weights = coefficients.ma_lag_weights(period);
        let residuals = innovations(stationary, &ar_weights, &ma_weights);
        let sigma2 = residuals.iter().map(|e| e * e).sum::<f64>() / residuals.len() as f64;

        if !sigma2.is_finite() {
            return Err(MathError::CalculationError(format!(
                "{} estimation produced a non-finite innovation variance",
                self.name
            )));
        }

        Ok(FittedSarima {
            name: self.name.clone(),
            coefficients,
            ar_weights,
            ma_weights,
            differenced,
            residuals,
            sigma2,
            iterations,
        })
    }
}

/// SARIMA model fitted to a specific series
#[derive(Debug, Clone)]
pub struct FittedSarima {
    name: String,
    coefficients: SarimaCoefficients,
    ar_weights: Vec<f64>,
    ma_weights: Vec<f64>,
    differenced: DifferencedSeries,
    residuals: Vec<f64>,
    sigma2: f64,
    iterations: usize,
}

impl FittedSarima {
    /// Point forecasts for the `horizon` steps after the fitted series
    pub fn forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        let mut values = self.differenced.stationary().to_vec();
        let mut errors = self.residuals.clone();
        let start = values.len();

        for t in start..start + horizon {
            let next = arma_prediction(&values, &errors, t, &self.ar_weights, &self.ma_weights);
            values.push(next);
            errors.push(0.0);
        }

        let forecast = self.differenced.integrate(&values[start..])?;
        if forecast.iter().any(|v| !v.is_finite()) {
            return Err(MathError::CalculationError(format!(
                "{} produced a non-finite forecast",
                self.name
            )));
        }

        Ok(forecast)
    }

    /// Get the name of the model
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coefficients(&self) -> &SarimaCoefficients {
        &self.coefficients
    }

    /// Innovations of the differenced series at the estimated coefficients
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Mean squared innovation
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Root mean squared innovation
    pub fn residual_rmse(&self) -> f64 {
        self.sigma2.sqrt()
    }

    /// Optimiser iterations spent on estimation
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}
