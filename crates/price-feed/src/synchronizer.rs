//! Price feed synchronizer - snapshot, then a supervised ticker stream

use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tracing::{debug, error, info, warn};

use signaldeck_core::{FeedConfig, FeedHealth, PriceFeedError, PriceFeedResult, Quote};

use crate::backoff::Backoff;
use crate::feeds::{combined_stream_url, parse_stream_message, StreamConnection, StreamConnector, WsConnector};
use crate::snapshot::{snapshot_quotes, RestSnapshot, SnapshotSource};
use crate::state::PriceBoard;

/// Keeps a [`PriceBoard`] in sync with the exchange for a fixed symbol universe
pub struct PriceFeedSynchronizer {
    config: Arc<FeedConfig>,
    board: PriceBoard,
    snapshot: Arc<dyn SnapshotSource>,
    connector: Arc<dyn StreamConnector>,
    update_tx: broadcast::Sender<Quote>,
    active: Option<ActiveFeed>,
}

struct ActiveFeed {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PriceFeedSynchronizer {
    pub fn new(
        config: FeedConfig,
        snapshot: Arc<dyn SnapshotSource>,
        connector: Arc<dyn StreamConnector>,
    ) -> PriceFeedResult<Self> {
        config.validate()?;
        let (update_tx, _) = broadcast::channel(config.update_channel_size);

        Ok(Self {
            config: Arc::new(config),
            board: PriceBoard::new(),
            snapshot,
            connector,
            update_tx,
            active: None,
        })
    }

    /// Synchronizer backed by the REST snapshot client and tokio-tungstenite
    pub fn binance(config: FeedConfig) -> PriceFeedResult<Self> {
        let snapshot = RestSnapshot::with_timeout(&config.rest_url, config.request_timeout())?;
        Self::new(config, Arc::new(snapshot), Arc::new(WsConnector))
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Read handle on the quote table
    pub fn board(&self) -> PriceBoard {
        self.board.clone()
    }

    /// Receive every quote written to the table. Slow receivers lag rather than block the feed.
    pub fn subscribe(&self) -> broadcast::Receiver<Quote> {
        self.update_tx.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Start syncing. An already active feed is torn down first.
    pub async fn activate(&mut self) {
        if self.active.is_some() {
            self.deactivate().await;
        }

        info!("Activating price feed for {} symbols", self.config.symbols.len());

        self.board.reset();
        self.board.set_loading(true);
        self.board.set_health(FeedHealth::Connecting);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let supervisor = Supervisor {
            config: Arc::clone(&self.config),
            board: self.board.clone(),
            snapshot: Arc::clone(&self.snapshot),
            connector: Arc::clone(&self.connector),
            update_tx: self.update_tx.clone(),
        };

        let handle = tokio::spawn(supervisor.run(shutdown_rx));

        self.active = Some(ActiveFeed {
            shutdown: shutdown_tx,
            handle,
        });
    }

    /// Stop syncing and close the stream. No table write happens after this returns.
    pub async fn deactivate(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        info!("Deactivating price feed");
        let _ = active.shutdown.send(true);

        if let Err(e) = active.handle.await {
            error!("Price feed task ended abnormally: {}", e);
        }

        self.board.set_loading(false);
        self.board.set_health(FeedHealth::Stopped);
    }
}

impl fmt::Debug for PriceFeedSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceFeedSynchronizer")
            .field("symbols", &self.config.symbols)
            .field("active", &self.is_active())
            .field("health", &self.board.health())
            .finish()
    }
}

impl Drop for PriceFeedSynchronizer {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.shutdown.send(true);
            active.handle.abort();
        }
    }
}

/// Sole writer of the board while a feed is active
struct Supervisor {
    config: Arc<FeedConfig>,
    board: PriceBoard,
    snapshot: Arc<dyn SnapshotSource>,
    connector: Arc<dyn StreamConnector>,
    update_tx: broadcast::Sender<Quote>,
}

enum ReadExit {
    Shutdown,
    Disconnected(PriceFeedError),
}

enum ReadEvent {
    Shutdown,
    Frame(Option<PriceFeedResult<String>>),
    Deadline,
}

impl Supervisor {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let url = combined_stream_url(&self.config.stream_url, &self.config.symbols);

        let loaded = tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => false,
            _ = self.sync_snapshot() => true,
        };

        // Cleared on failure too, so consumers never hang on the loading state
        self.board.set_loading(false);
        if !loaded {
            return;
        }

        let mut backoff = Backoff::new(self.config.initial_backoff(), self.config.max_backoff());
        let mut resync = false;

        loop {
            let connect = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => return,
                result = timeout(self.config.connect_timeout(), self.connector.connect(&url)) => {
                    result.unwrap_or_else(|_| Err(PriceFeedError::Timeout(self.config.connect_timeout_ms)))
                }
            };

            match connect {
                Ok(mut connection) => {
                    info!("Ticker stream connected");
                    self.board.set_health(FeedHealth::Live);

                    if resync {
                        let finished = tokio::select! {
                            biased;
                            _ = wait_for_shutdown(&mut shutdown) => false,
                            _ = self.sync_snapshot() => true,
                        };
                        if !finished {
                            self.close_connection(connection.as_mut()).await;
                            return;
                        }
                    }
                    resync = true;

                    let exit = self
                        .read_frames(connection.as_mut(), &mut backoff, &mut shutdown)
                        .await;
                    self.close_connection(connection.as_mut()).await;

                    match exit {
                        ReadExit::Shutdown => {
                            info!("Ticker stream closed");
                            return;
                        }
                        ReadExit::Disconnected(e) => warn!("Ticker stream lost: {}", e),
                    }
                }
                Err(e) => error!("Ticker stream connect failed: {}", e),
            }

            if let Some(max) = self.config.max_reconnects {
                if backoff.attempt() >= max {
                    error!("Max reconnects ({}) reached, giving up on ticker stream", max);
                    self.board.set_health(FeedHealth::Failed);
                    return;
                }
            }

            let delay = backoff.next_delay();
            let attempt = backoff.attempt();
            self.board.set_health(FeedHealth::Reconnecting { attempt });
            self.board.record_reconnect();

            warn!("Reconnecting ticker stream in {:?} (attempt {})", delay, attempt);

            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => return,
                _ = sleep(delay) => {}
            }
        }
    }

    /// Fetch the bulk snapshot and write every tracked symbol it contains
    async fn sync_snapshot(&self) -> usize {
        match self.snapshot.fetch_tickers().await {
            Ok(tickers) => {
                let quotes = snapshot_quotes(&tickers, &self.config.symbols);
                let count = quotes.len();

                for quote in quotes {
                    self.publish(quote);
                }

                info!(
                    "Snapshot loaded {} of {} tracked symbols",
                    count,
                    self.config.symbols.len()
                );
                count
            }
            Err(e) => {
                error!("Failed to fetch ticker snapshot: {}", e);
                0
            }
        }
    }

    /// Apply frames until the stream drops or shutdown is signalled.
    ///
    /// The backoff only resets once the connection delivers a frame, so an
    /// endpoint that accepts and hangs up at once keeps backing off.
    async fn read_frames(
        &self,
        connection: &mut dyn StreamConnection,
        backoff: &mut Backoff,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ReadExit {
        let stale_after = self.config.stale_after();
        let idle_timeout = self.config.idle_timeout();

        let mut last_frame = Instant::now();
        let mut stale = false;
        let mut delivered = false;

        loop {
            let idle_at = last_frame + idle_timeout;
            let deadline = if stale {
                idle_at
            } else {
                (last_frame + stale_after).min(idle_at)
            };

            let event = tokio::select! {
                biased;
                _ = wait_for_shutdown(shutdown) => ReadEvent::Shutdown,
                frame = connection.next_frame() => ReadEvent::Frame(frame),
                _ = sleep_until(deadline) => ReadEvent::Deadline,
            };

            match event {
                ReadEvent::Shutdown => return ReadExit::Shutdown,
                ReadEvent::Frame(Some(Ok(text))) => {
                    last_frame = Instant::now();
                    if !delivered {
                        delivered = true;
                        backoff.reset();
                    }
                    if stale {
                        stale = false;
                        self.board.set_health(FeedHealth::Live);
                    }
                    self.handle_frame(&text);
                }
                ReadEvent::Frame(Some(Err(e))) => return ReadExit::Disconnected(e),
                ReadEvent::Frame(None) => return ReadExit::Disconnected(PriceFeedError::Disconnected),
                ReadEvent::Deadline => {
                    if Instant::now() >= idle_at {
                        warn!("No ticker frames for {:?}, reopening stream", idle_timeout);
                        return ReadExit::Disconnected(PriceFeedError::Timeout(
                            self.config.idle_timeout_ms,
                        ));
                    }
                    warn!("No ticker frames for {:?}, marking data stale", stale_after);
                    stale = true;
                    self.board.set_health(FeedHealth::Stale);
                }
            }
        }
    }

    /// Close handshake, bounded so a peer that stopped reading cannot stall teardown
    async fn close_connection(&self, connection: &mut dyn StreamConnection) {
        if timeout(self.config.connect_timeout(), connection.close()).await.is_err() {
            warn!(
                "Ticker stream close timed out after {}ms, dropping connection",
                self.config.connect_timeout_ms
            );
        }
    }

    /// Apply one frame; malformed frames are skipped and never end the connection
    fn handle_frame(&self, text: &str) {
        match parse_stream_message(text) {
            Ok(Some(quote)) => {
                if !self.config.is_tracked(&quote.symbol) {
                    debug!("Ignoring update for untracked symbol {}", quote.symbol);
                    return;
                }
                debug!("{} last={} chg={}%", quote.symbol, quote.last_price, quote.percent_change);
                self.publish(quote);
            }
            Ok(None) => debug!("Ignoring frame without payload"),
            Err(e) => {
                warn!("Skipping malformed ticker frame: {}", e);
                self.board.record_skipped();
            }
        }
    }

    fn publish(&self, quote: Quote) {
        self.board.apply(quote.clone());
        // Err only means nobody is subscribed
        let _ = self.update_tx.send(quote);
    }
}

/// Resolves once shutdown is signalled or the synchronizer is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
