use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use demand_forecast::optimization::{optimize, read_annotated, PRESENTATION_PLACES};
use demand_forecast::data::DemandRecord;
use demand_forecast::models::{DemandForecaster, SarimaForecaster};
use demand_forecast::{ForecastArtifact, ForecastError, ReplenishmentConfig, ReplenishmentOptimizer};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Poisson};
use rstest::rstest;
use tempfile::TempDir;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn flat_forecast(days: usize) -> ForecastArtifact {
    ForecastArtifact::from_values(day(2024, 10, 1), &vec![10.0; days]).unwrap()
}

#[test]
fn test_constant_demand_scenario() {
    let result = optimize(&flat_forecast(30), &ReplenishmentConfig::default()).unwrap();

    assert_abs_diff_eq!(result.z_score, 1.644854, epsilon = 1e-6);
    assert_abs_diff_eq!(result.safety_stock, 112.5, epsilon = 0.05);
    assert_abs_diff_eq!(result.average_daily_demand, 10.0, epsilon = 1e-12);
    assert_abs_diff_eq!(result.order_quantity, 140.0, epsilon = 1e-9);
    assert_abs_diff_eq!(result.order_today, 182.5, epsilon = 0.05);
    assert_eq!(result.lead_time_days, 7);
    assert_eq!(result.days.len(), 30);
}

#[test]
fn test_partial_windows_at_start() {
    let result = optimize(&flat_forecast(10), &ReplenishmentConfig::default()).unwrap();

    let lead_time_demand: Vec<f64> = result.days.iter().map(|d| d.lead_time_demand).collect();
    assert_eq!(
        lead_time_demand,
        vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 70.0, 70.0, 70.0]
    );
}

#[test]
fn test_rolling_invariant() {
    let values: Vec<f64> = (0..45)
        .map(|t| 20.0 + 6.0 * ((t as f64) * 0.9).sin())
        .collect();
    let artifact = ForecastArtifact::from_values(day(2024, 1, 1), &values).unwrap();
    let result = optimize(&artifact, &ReplenishmentConfig::default()).unwrap();
    let total: f64 = values.iter().sum();

    for (i, row) in result.days.iter().enumerate() {
        assert_eq!(row.reorder_point, row.lead_time_demand + result.safety_stock);
        assert!(row.lead_time_demand <= total);

        let start = i.saturating_sub(6);
        let expected: f64 = values[start..=i].iter().sum();
        assert_abs_diff_eq!(row.lead_time_demand, expected, epsilon = 1e-9);
    }
}

#[rstest]
#[case(1)]
#[case(5)]
#[case(11)]
fn test_intermittent_demand_plan_stays_non_negative(#[case] seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let sales = Poisson::new(1.5).unwrap();
    let first = day(2024, 1, 1);
    let records: Vec<DemandRecord> = (0..120)
        .map(|i| DemandRecord {
            date: first + chrono::Duration::days(i),
            demand: sales.sample(&mut rng),
            inventory: 40.0,
        })
        .collect();

    let artifact = SarimaForecaster::default()
        .fit_and_forecast(&records, 90, day(2024, 4, 30))
        .unwrap();
    let values = artifact.predicted_demand();
    assert!(values.iter().all(|v| *v >= 0.0));

    let result = optimize(&artifact, &ReplenishmentConfig::default()).unwrap();
    let total: f64 = values.iter().sum();
    for row in &result.days {
        assert!(row.lead_time_demand >= 0.0);
        assert!(row.lead_time_demand <= total + 1e-9);
    }
    assert!(result.average_daily_demand >= 0.0);
    assert!(result.order_quantity >= 0.0);
    assert!(result.order_today >= result.safety_stock);
}

#[test]
fn test_lead_time_longer_than_forecast() {
    let config = ReplenishmentConfig {
        lead_time_days: 14,
        ..ReplenishmentConfig::default()
    };
    let result = optimize(&flat_forecast(5), &config).unwrap();

    assert_abs_diff_eq!(result.order_today, 50.0 + result.safety_stock, epsilon = 1e-9);
    assert_abs_diff_eq!(result.days[4].lead_time_demand, 50.0, epsilon = 1e-9);
}

#[rstest]
#[case(0.90, 0.95)]
#[case(0.95, 0.99)]
#[case(0.50, 0.80)]
fn test_safety_stock_monotone_in_service_level(#[case] lower: f64, #[case] higher: f64) {
    let at = |service_level: f64| {
        let config = ReplenishmentConfig {
            service_level,
            ..ReplenishmentConfig::default()
        };
        optimize(&flat_forecast(14), &config).unwrap().safety_stock
    };

    assert!(at(higher) > at(lower));
}

#[test]
fn test_zero_rmse_means_no_safety_stock() {
    let config = ReplenishmentConfig {
        forecast_rmse: 0.0,
        ..ReplenishmentConfig::default()
    };
    let result = optimize(&flat_forecast(7), &config).unwrap();
    assert_eq!(result.safety_stock, 0.0);
    assert_eq!(result.order_today, 70.0);
}

#[rstest]
#[case(ReplenishmentConfig { lead_time_days: 0, ..ReplenishmentConfig::default() })]
#[case(ReplenishmentConfig { forecast_rmse: -1.0, ..ReplenishmentConfig::default() })]
#[case(ReplenishmentConfig { service_level: 1.0, ..ReplenishmentConfig::default() })]
#[case(ReplenishmentConfig { service_level: 0.0, ..ReplenishmentConfig::default() })]
#[case(ReplenishmentConfig { cover_days: 0, ..ReplenishmentConfig::default() })]
fn test_invalid_config_rejected(#[case] config: ReplenishmentConfig) {
    assert!(matches!(
        optimize(&flat_forecast(7), &config),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_rounding_only_at_presentation() {
    let artifact =
        ForecastArtifact::from_values(day(2024, 1, 1), &[1.004, 1.004, 1.004, 1.004]).unwrap();
    let config = ReplenishmentConfig {
        lead_time_days: 3,
        forecast_rmse: 0.0,
        ..ReplenishmentConfig::default()
    };
    let result = optimize(&artifact, &config).unwrap();

    // Rolling sums carry full precision
    assert_abs_diff_eq!(result.days[2].lead_time_demand, 3.012, epsilon = 1e-12);

    let shown = result.rounded(PRESENTATION_PLACES);
    assert_eq!(shown.days[0].predicted_demand, 1.0);
    assert_eq!(shown.days[2].lead_time_demand, 3.01);
    assert_eq!(shown.order_today, 3.01);
    assert_eq!(shown.lead_time_days, 3);
}

#[test]
fn test_annotated_copy_written() {
    let dir = TempDir::new().unwrap();
    let optimizer = ReplenishmentOptimizer::new(dir.path());
    let today = day(2024, 10, 1);

    let result = optimizer
        .optimize(today, &flat_forecast(20), &ReplenishmentConfig::default())
        .unwrap();

    let path = optimizer.annotated_path(today);
    assert_eq!(path, dir.path().join("optimization_2024-10-01.csv"));
    assert_eq!(read_annotated(&path).unwrap(), result.days);
}

#[test]
fn test_missing_annotated_copy() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        read_annotated(&dir.path().join("optimization_2024-01-01.csv")),
        Err(ForecastError::DataUnavailable(_))
    ));
}
