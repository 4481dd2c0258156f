//! aura-replenish: demand forecast and replenishment plan for today
//!
//! Prints one JSON document on stdout; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{debug, error};

use demand_forecast::logging::init_tracing;
use demand_forecast::optimization::PRESENTATION_PLACES;
use demand_forecast::{EngineConfig, ForecastAnchor, ForecastError, ReplenishmentEngine, Result};

/// Demand forecast cache and replenishment engine
#[derive(Parser)]
#[command(name = "aura-replenish", version, about = "Daily demand forecast and replenishment plan")]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Demand history CSV
    #[arg(long)]
    history: Option<PathBuf>,

    /// Directory holding the daily forecast artifacts
    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    /// Processing time (YYYY-MM-DDTHH:MM:SS or YYYY-MM-DD); defaults to local now
    #[arg(long)]
    now: Option<String>,

    /// First forecast day: today or after_history
    #[arg(long)]
    anchor: Option<ForecastAnchor>,

    /// Hour from which today's prediction is added to the history
    #[arg(long)]
    cutoff_hour: Option<u32>,

    /// Log filter when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the forecast for the next days
    Forecast {
        /// Days to return; the configured horizon when omitted
        #[arg(long)]
        horizon: Option<usize>,
    },
    /// Print safety stock, reorder points and order quantities
    Optimize {
        #[arg(long)]
        lead_time: Option<usize>,
        #[arg(long)]
        rmse: Option<f64>,
        #[arg(long)]
        service_level: Option<f64>,
        #[arg(long)]
        cover_days: Option<usize>,
    },
}

fn parse_now(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(now) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(now);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ForecastError::InvalidParameter(format!("Cannot parse --now value '{}'", raw)))
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    if let Some(history) = &cli.history {
        config.paths.history_file = history.clone();
    }
    if let Some(dir) = &cli.artifact_dir {
        config.paths.artifact_dir = dir.clone();
    }
    if let Some(anchor) = cli.anchor {
        config.forecast.anchor = anchor;
    }
    if let Some(hour) = cli.cutoff_hour {
        config.forecast.cutoff_hour = hour;
    }
    if let Command::Optimize {
        lead_time,
        rmse,
        service_level,
        cover_days,
    } = &cli.command
    {
        let replenishment = &mut config.replenishment;
        if let Some(days) = lead_time {
            replenishment.lead_time_days = *days;
        }
        if let Some(rmse) = rmse {
            replenishment.forecast_rmse = *rmse;
        }
        if let Some(level) = service_level {
            replenishment.service_level = *level;
        }
        if let Some(days) = cover_days {
            replenishment.cover_days = *days;
        }
    }

    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<Value> {
    let config = load_config(cli)?;
    let now = match &cli.now {
        Some(raw) => parse_now(raw)?,
        None => Local::now().naive_local(),
    };
    debug!(%now, history = %config.paths.history_file.display(), "starting");

    let engine = ReplenishmentEngine::from_config(&config)?;

    match &cli.command {
        Command::Forecast { horizon } => {
            let horizon = horizon.unwrap_or(config.forecast.horizon_days);
            let forecast = engine.get_forecast(now, horizon)?;
            Ok(json!({ "success": true, "forecast": forecast.records() }))
        }
        Command::Optimize { .. } => {
            let plan = engine.get_optimization(now, &config.replenishment)?;
            Ok(json!({
                "success": true,
                "optimization": plan.rounded(PRESENTATION_PLACES),
            }))
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(&cli) {
        Ok(body) => {
            println!("{}", body);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, kind = %e.kind(), "request failed");
            println!(
                "{}",
                json!({ "success": false, "kind": e.kind().as_str(), "error": e.to_string() })
            );
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_now() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(13, 5, 0)
            .unwrap();
        assert_eq!(parse_now("2024-03-09T13:05:00").unwrap(), expected);
        assert_eq!(parse_now("2024-03-09 13:05:00").unwrap(), expected);
        assert_eq!(parse_now(" 2024-03-09T13:05 ").unwrap(), expected);
        assert_eq!(
            parse_now("2024-03-09").unwrap(),
            expected.date().and_hms_opt(0, 0, 0).unwrap()
        );
        assert!(parse_now("noon").is_err());
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::parse_from([
            "aura-replenish",
            "--anchor",
            "after_history",
            "--cutoff-hour",
            "9",
            "optimize",
            "--lead-time",
            "3",
            "--service-level",
            "0.99",
        ]);
        let config = load_config(&cli).unwrap();

        assert_eq!(config.forecast.anchor, ForecastAnchor::AfterHistory);
        assert_eq!(config.forecast.cutoff_hour, 9);
        assert_eq!(config.replenishment.lead_time_days, 3);
        assert_eq!(config.replenishment.service_level, 0.99);
        assert_eq!(config.replenishment.forecast_rmse, 25.85);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let cli = Cli::parse_from(["aura-replenish", "optimize", "--service-level", "1.2"]);
        assert!(matches!(load_config(&cli), Err(ForecastError::Config(_))));
    }
}
