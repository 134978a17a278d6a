//! Settings loading: optional `signaldeck.toml`, then `SIGNALDECK__*` environment overrides

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use signaldeck_core::FeedConfig;

pub const ENV_PREFIX: &str = "SIGNALDECK";
pub const DEFAULT_FILE: &str = "signaldeck";

/// Complete board configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub feed: FeedConfig,
    pub render_interval_ms: u64,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            render_interval_ms: 5_000,
            log_json: false,
        }
    }
}

impl BoardSettings {
    /// Load from `signaldeck.{toml,yaml,json}` if present, overlaid with the process environment
    pub fn load() -> anyhow::Result<Self> {
        let settings = Self::from_sources(File::with_name(DEFAULT_FILE).required(false), environment())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_sources<F>(file: F, env: Environment) -> Result<Self, ConfigError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.feed.validate()?;
        anyhow::ensure!(self.render_interval_ms > 0, "render_interval_ms must be > 0");
        Ok(())
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }
}

/// `SIGNALDECK__FEED__SYMBOLS=BTCUSDT,ETHUSDT` style overrides
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("feed.symbols")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use signaldeck_core::Symbol;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    fn no_file() -> impl config::Source + Send + Sync + 'static {
        File::from_str("", FileFormat::Toml)
    }

    #[test]
    fn test_defaults_without_sources() {
        let settings = BoardSettings::from_sources(no_file(), env(&[])).unwrap();

        assert_eq!(settings, BoardSettings::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_file_values() {
        let toml = r#"
            render_interval_ms = 1000

            [feed]
            symbols = ["btcusdt", "ethusdt"]
            max_backoff_ms = 10000
        "#;

        let settings =
            BoardSettings::from_sources(File::from_str(toml, FileFormat::Toml), env(&[])).unwrap();

        assert_eq!(settings.render_interval(), Duration::from_secs(1));
        assert_eq!(
            settings.feed.symbols,
            vec![Symbol::new("BTCUSDT").unwrap(), Symbol::new("ETHUSDT").unwrap()]
        );
        assert_eq!(settings.feed.max_backoff_ms, 10_000);
        assert_eq!(settings.feed.initial_backoff_ms, 1_000);
    }

    #[test]
    fn test_environment_overrides_file() {
        let toml = r#"
            [feed]
            symbols = ["BTCUSDT"]
        "#;

        let settings = BoardSettings::from_sources(
            File::from_str(toml, FileFormat::Toml),
            env(&[
                ("SIGNALDECK__FEED__SYMBOLS", "solusdt,bnbusdt"),
                ("SIGNALDECK__FEED__MAX_RECONNECTS", "5"),
                ("SIGNALDECK__LOG_JSON", "true"),
            ]),
        )
        .unwrap();

        assert_eq!(
            settings.feed.symbols,
            vec![Symbol::new("SOLUSDT").unwrap(), Symbol::new("BNBUSDT").unwrap()]
        );
        assert_eq!(settings.feed.max_reconnects, Some(5));
        assert!(settings.log_json);
    }

    #[test]
    fn test_invalid_symbol_is_rejected() {
        let result = BoardSettings::from_sources(
            no_file(),
            env(&[("SIGNALDECK__FEED__SYMBOLS", "BTC/USDT")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let settings = BoardSettings {
            render_interval_ms: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
