//! Configuration types

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::{CoreError, CoreResult, Symbol};

pub const DEFAULT_REST_URL: &str = "https://api.binance.com";
pub const DEFAULT_STREAM_URL: &str = "wss://stream.binance.com:9443";
pub const DEFAULT_SYMBOLS: [&str; 4] = ["BTCUSDT", "ETHUSDT", "SOLUSDT", "BNBUSDT"];

/// Price feed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the REST market-data API
    pub rest_url: String,
    /// Base URL of the streaming market-data API
    pub stream_url: String,
    /// Tracked-symbol universe, in subscription order
    pub symbols: Vec<Symbol>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// `None` retries forever
    pub max_reconnects: Option<u32>,
    pub stale_after_ms: u64,
    /// Silence after which the connection is considered dead and reopened
    pub idle_timeout_ms: u64,
    pub update_channel_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            rest_url: DEFAULT_REST_URL.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            symbols: DEFAULT_SYMBOLS
                .iter()
                .map(|s| Symbol(s.to_string()))
                .collect(),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 10_000,
            initial_backoff_ms: 1_000,  // 1s first retry
            max_backoff_ms: 30_000,     // capped at 30s
            max_reconnects: None,
            stale_after_ms: 15_000,
            idle_timeout_ms: 60_000,
            update_channel_size: 1_024,
        }
    }
}

impl FeedConfig {
    pub fn with_symbols<I, S>(mut self, symbols: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.symbols = symbols
            .into_iter()
            .map(Symbol::new)
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(self)
    }

    pub fn is_tracked(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.symbols.is_empty() {
            return Err(CoreError::InvalidConfig("symbol universe is empty".into()));
        }

        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if !seen.insert(symbol) {
                return Err(CoreError::InvalidConfig(format!(
                    "duplicate symbol {symbol}"
                )));
            }
        }

        for (name, value) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("initial_backoff_ms", self.initial_backoff_ms),
            ("stale_after_ms", self.stale_after_ms),
            ("idle_timeout_ms", self.idle_timeout_ms),
        ] {
            if value == 0 {
                return Err(CoreError::InvalidConfig(format!("{name} must be > 0")));
            }
        }

        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(CoreError::InvalidConfig(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }

        if self.update_channel_size == 0 {
            return Err(CoreError::InvalidConfig(
                "update_channel_size must be > 0".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FeedConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.symbols.len(), 4);
        assert_eq!(config.initial_backoff(), Duration::from_secs(1));
        assert_eq!(config.max_backoff(), Duration::from_secs(30));
    }

    #[test]
    fn test_with_symbols() {
        let config = FeedConfig::default()
            .with_symbols(["btcusdt", "ETHUSDT"])
            .unwrap();

        assert!(config.is_tracked(&Symbol::new("BTCUSDT").unwrap()));
        assert!(!config.is_tracked(&Symbol::new("SOLUSDT").unwrap()));
        assert!(FeedConfig::default().with_symbols(["BTC-USDT"]).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let empty = FeedConfig {
            symbols: vec![],
            ..Default::default()
        };
        assert!(empty.validate().is_err());

        let duplicate = FeedConfig::default()
            .with_symbols(["BTCUSDT", "btcusdt"])
            .unwrap();
        assert!(duplicate.validate().is_err());

        let inverted = FeedConfig {
            initial_backoff_ms: 60_000,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let zero_timeout = FeedConfig {
            connect_timeout_ms: 0,
            ..Default::default()
        };
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: FeedConfig =
            serde_json::from_str(r#"{"symbols": ["btcusdt"], "max_reconnects": 3}"#).unwrap();

        assert_eq!(config.symbols, vec![Symbol::new("BTCUSDT").unwrap()]);
        assert_eq!(config.max_reconnects, Some(3));
        assert_eq!(config.rest_url, DEFAULT_REST_URL);
    }
}
