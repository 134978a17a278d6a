//! Error types

use thiserror::Error;

/// Core error types
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Invalid decimal in {field}: {value:?}")]
    InvalidDecimal { field: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Price feed errors
#[derive(Debug, Error)]
pub enum PriceFeedError {
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Feed disconnected")]
    Disconnected,

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Snapshot request failed: {0}")]
    SnapshotFailed(String),

    #[error("Snapshot request returned status {status}")]
    SnapshotStatus { status: u16 },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<serde_json::Error> for PriceFeedError {
    fn from(err: serde_json::Error) -> Self {
        PriceFeedError::InvalidMessage(err.to_string())
    }
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
pub type PriceFeedResult<T> = Result<T, PriceFeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_converts() {
        let err: PriceFeedError = CoreError::InvalidSymbol("BTC/USDT".into()).into();
        assert!(matches!(err, PriceFeedError::Core(CoreError::InvalidSymbol(_))));
        assert_eq!(err.to_string(), "Invalid symbol: \"BTC/USDT\"");
    }

    #[test]
    fn test_disconnect_messages() {
        assert_eq!(PriceFeedError::Disconnected.to_string(), "Feed disconnected");
        assert_eq!(PriceFeedError::Timeout(60_000).to_string(), "Timeout after 60000ms");
    }
}
