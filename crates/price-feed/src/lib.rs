//! Live ticker synchronizer for a fixed symbol universe
//!
//! Features:
//! - One-shot REST snapshot, then a combined WebSocket ticker stream
//! - Single-writer quote table with lock-free reads
//! - Supervised reconnection with capped exponential backoff
//! - Stale-data detection exposed as feed health
//! - Explicit teardown: no table writes after deactivation

pub mod backoff;
pub mod feeds;
pub mod snapshot;
pub mod state;
pub mod synchronizer;

pub use feeds::{StreamConnection, StreamConnector, WsConnector};
pub use snapshot::{RestSnapshot, SnapshotSource, Ticker24h};
pub use state::{BoardStats, PriceBoard};
pub use synchronizer::PriceFeedSynchronizer;
