use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AlertsConfig, CapBaseline, Config, Instrument, LoggingConfig, Persistence, RiskManagement,
    SessionRules, Simulation, SizingMode, StopMode, StrategyParams,
};

/// Environment prefix for overrides, e.g. `TRENDGUARD__RISK_MANAGEMENT__RISK_FRACTION=0.02`.
const ENV_PREFIX: &str = "TRENDGUARD";

/// Loads the application configuration from a TOML file.
///
/// Values can be overridden from the environment using the `TRENDGUARD` prefix
/// with `__` as the section separator. The Telegram credentials are also read
/// from `TELEGRAM_TOKEN` and `TELEGRAM_CHAT_ID` when present. The result is
/// validated before it is returned.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("alerts.token", std::env::var("TELEGRAM_TOKEN").ok())?
        .set_override_option("alerts.chat_id", std::env::var("TELEGRAM_CHAT_ID").ok())?
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}

/// Parses and validates a configuration held in memory. No environment overrides apply.
pub fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?
        .try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [instrument]
        symbol = "SPXL"
        initial_capital = 100.0
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.instrument.symbol, "SPXL");
        assert_eq!(config.strategy.adx_period, 14);
        assert_eq!(config.strategy.ema_slow_period, 50);
        assert_eq!(config.risk_management.stop_mode, StopMode::Fixed);
        assert_eq!(config.risk_management.sizing, SizingMode::WholeUnits);
        assert_eq!(config.session.cap_fraction, None);
        assert_eq!(config.session.cap_baseline, CapBaseline::SessionStart);
        assert!(!config.alerts.enabled);
        assert_eq!(config.warmup_bars(), 50);
    }

    #[test]
    fn full_config_parses_enums_and_options() {
        let toml = r#"
            [instrument]
            symbol = "SPXL"
            initial_capital = 100.0

            [risk_management]
            risk_fraction = 0.30
            stop_multiple = 1.5
            stop_mode = "trailing"
            trailing_multiple = 1.0
            sizing = "fractional"

            [session]
            cap_fraction = 0.30
            cap_baseline = "previous_close"
            equity_floor = 70.0
            max_entries_per_session = 1
        "#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.risk_management.stop_mode, StopMode::Trailing);
        assert_eq!(config.risk_management.sizing, SizingMode::Fractional);
        assert_eq!(config.session.cap_fraction, Some(0.30));
        assert_eq!(config.session.cap_baseline, CapBaseline::PreviousClose);
        assert_eq!(config.session.equity_floor, Some(70.0));
        assert_eq!(config.session.max_entries_per_session, Some(1));
    }

    #[test]
    fn rejects_fast_period_not_below_slow() {
        let toml = format!(
            "{}\n[strategy]\nema_fast_period = 50\nema_slow_period = 20\n",
            MINIMAL
        );
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn rejects_risk_fraction_out_of_range() {
        let toml = format!("{}\n[risk_management]\nrisk_fraction = 1.5\n", MINIMAL);
        assert!(matches!(
            load_config_from_str(&toml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn missing_instrument_is_a_load_error() {
        assert!(matches!(
            load_config_from_str("[strategy]\nadx_period = 14\n"),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.instrument.initial_capital, 100.0);
    }
}
