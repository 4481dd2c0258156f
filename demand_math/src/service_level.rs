//! Service-level calculations for safety stock sizing

use crate::{MathError, Result};
use statrs::distribution::{ContinuousCDF, Normal};

/// Standard-normal quantile for a target probability of not stocking out
pub fn z_score(service_level: f64) -> Result<f64> {
    if !(service_level > 0.0 && service_level < 1.0) {
        return Err(MathError::InvalidInput(format!(
            "Service level must be strictly between 0 and 1, got {}",
            service_level
        )));
    }

    let standard = Normal::new(0.0, 1.0)
        .map_err(|e| MathError::CalculationError(format!("Standard normal unavailable: {}", e)))?;

    Ok(standard.inverse_cdf(service_level))
}

/// Buffer stock covering forecast error over the lead time:
/// `z * rmse * sqrt(lead_time_days)`
pub fn safety_stock(z: f64, forecast_rmse: f64, lead_time_days: usize) -> Result<f64> {
    if forecast_rmse < 0.0 || !forecast_rmse.is_finite() {
        return Err(MathError::InvalidInput(format!(
            "Forecast RMSE must be a finite non-negative number, got {}",
            forecast_rmse
        )));
    }
    if lead_time_days == 0 {
        return Err(MathError::InvalidInput(
            "Lead time must be at least one day".to_string(),
        ));
    }

    Ok(z * forecast_rmse * (lead_time_days as f64).sqrt())
}
