//! One-shot 24h ticker snapshot over REST (for startup and resync)

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use signaldeck_core::{PriceFeedError, PriceFeedResult, Quote, Symbol};

/// 24h rolling ticker statistics as returned by `/api/v3/ticker/24hr`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    pub symbol: String,
    pub last_price: String,
    pub price_change: String,
    pub price_change_percent: String,
}

/// Source of the bulk ticker snapshot
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_tickers(&self) -> PriceFeedResult<Vec<Ticker24h>>;
}

/// Binance-compatible REST snapshot client
pub struct RestSnapshot {
    client: reqwest::Client,
    url: String,
}

impl RestSnapshot {
    pub fn new(client: reqwest::Client, rest_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/api/v3/ticker/24hr", rest_url.trim_end_matches('/')),
        }
    }

    pub fn with_timeout(rest_url: &str, timeout: Duration) -> PriceFeedResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceFeedError::SnapshotFailed(e.to_string()))?;

        Ok(Self::new(client, rest_url))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SnapshotSource for RestSnapshot {
    async fn fetch_tickers(&self) -> PriceFeedResult<Vec<Ticker24h>> {
        debug!("Fetching ticker snapshot from {}", self.url);

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                PriceFeedError::SnapshotFailed(format!("request timed out: {e}"))
            } else {
                PriceFeedError::SnapshotFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceFeedError::SnapshotStatus {
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<Ticker24h>>()
            .await
            .map_err(|e| PriceFeedError::SnapshotFailed(format!("malformed body: {e}")))
    }
}

/// Build quotes for the tracked symbols present in a snapshot.
///
/// Matching is by exact symbol. Tickers with unparseable numbers are
/// skipped with a warning; untracked tickers are ignored.
pub fn snapshot_quotes(tickers: &[Ticker24h], universe: &[Symbol]) -> Vec<Quote> {
    universe
        .iter()
        .filter_map(|symbol| {
            let ticker = tickers.iter().find(|t| t.symbol == symbol.as_str())?;

            match Quote::from_raw(
                symbol.clone(),
                &ticker.last_price,
                &ticker.price_change,
                &ticker.price_change_percent,
            ) {
                Ok(quote) => Some(quote),
                Err(e) => {
                    warn!("Skipping snapshot ticker {}: {}", symbol, e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(symbol: &str, last: &str) -> Ticker24h {
        Ticker24h {
            symbol: symbol.to_string(),
            last_price: last.to_string(),
            price_change: "-12.345".to_string(),
            price_change_percent: "0.5".to_string(),
        }
    }

    fn universe(symbols: &[&str]) -> Vec<Symbol> {
        symbols.iter().map(|s| Symbol::new(s).unwrap()).collect()
    }

    #[test]
    fn test_deserialize_binance_payload() {
        let body = r#"[{
            "symbol": "BTCUSDT",
            "priceChange": "-94.99999800",
            "priceChangePercent": "-95.960",
            "weightedAvgPrice": "0.29628482",
            "lastPrice": "4.00000200",
            "volume": "8913.30000000",
            "count": 76
        }]"#;

        let tickers: Vec<Ticker24h> = serde_json::from_str(body).unwrap();
        assert_eq!(tickers.len(), 1);
        assert_eq!(tickers[0].last_price, "4.00000200");
        assert_eq!(tickers[0].price_change_percent, "-95.960");
    }

    #[test]
    fn test_snapshot_quotes_filters_universe() {
        let tickers = vec![
            ticker("BTCUSDT", "67432.104"),
            ticker("XRPUSDT", "0.5"),
            ticker("SOLUSDT", "150"),
        ];

        let quotes = snapshot_quotes(&tickers, &universe(&["BTCUSDT", "ETHUSDT", "SOLUSDT"]));

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].symbol.as_str(), "BTCUSDT");
        assert_eq!(quotes[0].last_price, "67432.10");
        assert_eq!(quotes[0].absolute_change, "-12.35");
        assert_eq!(quotes[1].last_price, "150.00");
    }

    #[test]
    fn test_snapshot_quotes_exact_match_only() {
        let tickers = vec![ticker("btcusdt", "1"), ticker("BTCUSDTX", "2")];
        assert!(snapshot_quotes(&tickers, &universe(&["BTCUSDT"])).is_empty());
    }

    #[test]
    fn test_snapshot_quotes_skips_bad_numbers() {
        let tickers = vec![ticker("BTCUSDT", "not-a-price"), ticker("ETHUSDT", "3500")];
        let quotes = snapshot_quotes(&tickers, &universe(&["BTCUSDT", "ETHUSDT"]));

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].symbol.as_str(), "ETHUSDT");
    }

    #[test]
    fn test_rest_url() {
        let source = RestSnapshot::new(reqwest::Client::new(), "https://api.binance.com/");
        assert_eq!(source.url(), "https://api.binance.com/api/v3/ticker/24hr");
    }
}
