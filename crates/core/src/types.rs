//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CoreError, CoreResult};

/// Suffix of the per-symbol ticker channel on the combined stream
pub const TICKER_STREAM_SUFFIX: &str = "@ticker";

/// Exchange identifier for a tradable pair, always upper-case (e.g. `BTCUSDT`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(pub(crate) String);

impl Symbol {
    pub fn new(raw: impl AsRef<str>) -> CoreResult<Self> {
        let trimmed = raw.as_ref().trim();

        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidSymbol(raw.as_ref().to_string()));
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Channel identifier on the combined stream, e.g. `btcusdt@ticker`
    pub fn stream_name(&self) -> String {
        format!("{}{}", self.0.to_ascii_lowercase(), TICKER_STREAM_SUFFIX)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Price direction as seen by a consumer, inferred from the percent change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    pub fn marker(&self) -> &'static str {
        match self {
            Direction::Up => "▲",
            Direction::Down => "▼",
            Direction::Flat => "■",
        }
    }
}

/// Connection health of a price feed, exposed to consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum FeedHealth {
    /// Never activated
    Idle,
    /// First connection attempt in progress
    Connecting,
    /// Connected and receiving frames
    Live,
    /// Connected, but no frame within the staleness window
    Stale,
    /// Connection lost, waiting to retry
    Reconnecting { attempt: u32 },
    /// Gave up after the configured number of reconnects
    Failed,
    /// Deactivated
    Stopped,
}

impl FeedHealth {
    pub fn name(&self) -> &'static str {
        match self {
            FeedHealth::Idle => "idle",
            FeedHealth::Connecting => "connecting",
            FeedHealth::Live => "live",
            FeedHealth::Stale => "stale",
            FeedHealth::Reconnecting { .. } => "reconnecting",
            FeedHealth::Failed => "failed",
            FeedHealth::Stopped => "stopped",
        }
    }

    /// Whether consumers should flag the displayed data as possibly out of date
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            FeedHealth::Stale
                | FeedHealth::Reconnecting { .. }
                | FeedHealth::Failed
                | FeedHealth::Stopped
        )
    }
}

impl fmt::Display for FeedHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedHealth::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            other => f.write_str(other.name()),
        }
    }
}
