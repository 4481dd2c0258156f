use demand_forecast::{EngineConfig, ForecastAnchor, ForecastError};
use demand_math::{ArimaOrder, SeasonalOrder};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_empty_document_gives_defaults() {
    let config = EngineConfig::from_toml_str("").unwrap();

    assert_eq!(config, EngineConfig::default());
    assert_eq!(config.paths.history_file, PathBuf::from("Demand_Trends.csv"));
    assert_eq!(config.forecast.horizon_days, 90);
    assert_eq!(config.forecast.cutoff_hour, 12);
    assert_eq!(config.forecast.anchor, ForecastAnchor::Today);
    assert_eq!(config.forecast.order, ArimaOrder { p: 2, d: 1, q: 2 });
    assert_eq!(config.forecast.seasonal_order.period, 7);
    assert_eq!(config.replenishment.lead_time_days, 7);
    assert_eq!(config.replenishment.forecast_rmse, 25.85);
    assert_eq!(config.replenishment.service_level, 0.95);
    assert_eq!(config.replenishment.cover_days, 14);
}

#[test]
fn test_partial_document() {
    let raw = r#"
        [paths]
        history_file = "/data/store_7.csv"

        [forecast]
        horizon_days = 30
        anchor = "after_history"
        seasonal_order = { p = 0, d = 1, q = 1, period = 7 }

        [replenishment]
        service_level = 0.99
    "#;
    let config = EngineConfig::from_toml_str(raw).unwrap();

    assert_eq!(config.paths.history_file, PathBuf::from("/data/store_7.csv"));
    assert_eq!(config.paths.artifact_dir, PathBuf::from("."));
    assert_eq!(config.forecast.horizon_days, 30);
    assert_eq!(config.forecast.anchor, ForecastAnchor::AfterHistory);
    assert_eq!(
        config.forecast.seasonal_order,
        SeasonalOrder {
            p: 0,
            d: 1,
            q: 1,
            period: 7
        }
    );
    assert_eq!(config.replenishment.service_level, 0.99);
    assert_eq!(config.replenishment.lead_time_days, 7);

    let forecaster = config.forecaster().unwrap();
    assert_eq!(forecaster.anchor(), ForecastAnchor::AfterHistory);
}

#[test]
fn test_validation_reports_every_issue() {
    let raw = r#"
        [forecast]
        horizon_days = 0
        cutoff_hour = 25

        [replenishment]
        lead_time_days = 0
        service_level = 1.5
    "#;

    match EngineConfig::from_toml_str(raw) {
        Err(ForecastError::Config(msg)) => {
            assert!(msg.contains("forecast.horizon_days"));
            assert!(msg.contains("forecast.cutoff_hour"));
            assert!(msg.contains("replenishment.lead_time_days"));
            assert!(msg.contains("replenishment.service_level"));
        }
        other => panic!("expected Config error, got {:?}", other),
    }
}

#[test]
fn test_malformed_toml() {
    assert!(matches!(
        EngineConfig::from_toml_str("[forecast\nhorizon_days = 3"),
        Err(ForecastError::Config(_))
    ));
    assert!(matches!(
        EngineConfig::from_toml_str("[forecast]\nanchor = \"tomorrow\""),
        Err(ForecastError::Config(_))
    ));
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("aura.toml");
    fs::write(&path, "[forecast]\ncutoff_hour = 9\n").unwrap();

    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.forecast.cutoff_hour, 9);

    assert!(matches!(
        EngineConfig::load(dir.path().join("missing.toml")),
        Err(ForecastError::Config(_))
    ));
}
