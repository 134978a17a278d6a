//! Quote table shared between the synchronizer and its consumers
//!
//! Uses DashMap so readers never block the single writer task

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use signaldeck_core::{FeedHealth, Quote, Symbol};

#[derive(Debug)]
struct BoardInner {
    /// Latest quote per symbol; absent means no data yet
    quotes: DashMap<Symbol, Quote>,

    loading: AtomicBool,
    health: RwLock<FeedHealth>,

    /// Stats
    update_count: AtomicU64,
    skipped_count: AtomicU64,
    reconnect_count: AtomicU64,
    last_update: RwLock<Option<Instant>>,
}

/// Read handle on the live quote table.
///
/// Cloning is cheap and every clone sees the same table. Only the owning
/// synchronizer can write to it.
#[derive(Debug, Clone)]
pub struct PriceBoard {
    inner: Arc<BoardInner>,
}

impl PriceBoard {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(BoardInner {
                quotes: DashMap::new(),
                loading: AtomicBool::new(false),
                health: RwLock::new(FeedHealth::Idle),
                update_count: AtomicU64::new(0),
                skipped_count: AtomicU64::new(0),
                reconnect_count: AtomicU64::new(0),
                last_update: RwLock::new(None),
            }),
        }
    }

    /// Latest quote for a symbol
    pub fn get(&self, symbol: &Symbol) -> Option<Quote> {
        self.inner.quotes.get(symbol).map(|r| r.value().clone())
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.inner.quotes.contains_key(symbol)
    }

    /// Point-in-time copy of the whole table
    pub fn snapshot(&self) -> HashMap<Symbol, Quote> {
        self.inner
            .quotes
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.quotes.is_empty()
    }

    /// True while the initial snapshot is being fetched
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire)
    }

    pub fn health(&self) -> FeedHealth {
        *self.inner.health.read()
    }

    pub fn stats(&self) -> BoardStats {
        BoardStats {
            quote_count: self.inner.quotes.len(),
            update_count: self.inner.update_count.load(Ordering::Relaxed),
            skipped_count: self.inner.skipped_count.load(Ordering::Relaxed),
            reconnect_count: self.inner.reconnect_count.load(Ordering::Relaxed),
            last_update_age: self.inner.last_update.read().map(|t| t.elapsed()),
        }
    }

    /// Replace the quote for its symbol. Returns true if the stored value changed.
    pub(crate) fn apply(&self, quote: Quote) -> bool {
        let changed = match self.inner.quotes.insert(quote.symbol.clone(), quote.clone()) {
            Some(previous) => previous != quote,
            None => true,
        };

        self.inner.update_count.fetch_add(1, Ordering::Relaxed);
        *self.inner.last_update.write() = Some(Instant::now());
        changed
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.inner.loading.store(loading, Ordering::Release);
    }

    pub(crate) fn set_health(&self, health: FeedHealth) {
        *self.inner.health.write() = health;
    }

    pub(crate) fn record_skipped(&self) {
        self.inner.skipped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect(&self) {
        self.inner.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Empty the table for a fresh activation
    pub(crate) fn reset(&self) {
        self.inner.quotes.clear();
        self.inner.update_count.store(0, Ordering::Relaxed);
        self.inner.skipped_count.store(0, Ordering::Relaxed);
        self.inner.reconnect_count.store(0, Ordering::Relaxed);
        *self.inner.last_update.write() = None;
    }
}

/// Empty idle board with no writer attached
impl Default for PriceBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the quote table
#[derive(Debug, Clone)]
pub struct BoardStats {
    pub quote_count: usize,
    pub update_count: u64,
    pub skipped_count: u64,
    pub reconnect_count: u64,
    pub last_update_age: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn quote(symbol: &str, price: &str) -> Quote {
        Quote::from_raw(Symbol::new(symbol).unwrap(), price, "0", "0").unwrap()
    }

    #[test]
    fn test_default_board_is_idle() {
        let board = PriceBoard::default();

        assert!(board.is_empty());
        assert!(!board.is_loading());
        assert_eq!(board.health(), FeedHealth::Idle);
        assert!(board.stats().last_update_age.is_none());
    }

    #[test]
    fn test_apply_overwrites() {
        let board = PriceBoard::new();
        let btc = Symbol::new("BTCUSDT").unwrap();

        assert!(board.apply(quote("BTCUSDT", "100")));
        assert!(board.apply(quote("BTCUSDT", "101")));

        assert_eq!(board.len(), 1);
        assert_eq!(board.get(&btc).unwrap().last_price, "101.00");
        assert_eq!(board.stats().update_count, 2);
    }

    #[test]
    fn test_apply_same_quote_is_idempotent() {
        let board = PriceBoard::new();

        assert!(board.apply(quote("ETHUSDT", "3500.5")));
        let first = board.snapshot();

        assert!(!board.apply(quote("ETHUSDT", "3500.5")));
        assert_eq!(board.snapshot(), first);
    }

    #[test]
    fn test_reset_clears_table() {
        let board = PriceBoard::new();
        board.apply(quote("BTCUSDT", "1"));
        board.record_skipped();

        board.reset();

        assert!(board.is_empty());
        assert_eq!(board.stats().skipped_count, 0);
        assert!(board.stats().last_update_age.is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let board = PriceBoard::new();
        let reader = board.clone();

        board.set_loading(true);
        board.set_health(FeedHealth::Live);
        board.apply(quote("SOLUSDT", "150.126"));

        assert!(reader.is_loading());
        assert_eq!(reader.health(), FeedHealth::Live);
        assert_eq!(
            reader.get(&Symbol::new("SOLUSDT").unwrap()).unwrap().last_price,
            "150.13"
        );
    }

    #[test]
    fn test_concurrent_readers() {
        use std::thread;

        let board = PriceBoard::new();
        let writer = board.clone();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let board = board.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(board.len() <= 1);
                    }
                })
            })
            .collect();

        for i in 0..100 {
            writer.apply(quote("BTCUSDT", &i.to_string()));
        }

        for h in readers {
            h.join().unwrap();
        }

        assert_eq!(board.stats().update_count, 100);
        assert_eq!(board.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_duplicate_updates_leave_same_table(
            updates in proptest::collection::vec((0usize..3, 0u32..10_000_000), 1..50)
        ) {
            let symbols = ["BTCUSDT", "ETHUSDT", "SOLUSDT"];
            let once = PriceBoard::new();
            let twice = PriceBoard::new();

            for (i, cents) in &updates {
                let q = quote(symbols[*i], &format!("{}.{:02}", cents / 100, cents % 100));
                once.apply(q.clone());
                twice.apply(q.clone());
                twice.apply(q);
            }

            prop_assert_eq!(once.snapshot(), twice.snapshot());
            prop_assert!(once.len() <= symbols.len());
        }
    }
}
