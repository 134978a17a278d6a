//! SignalDeck ticker board
//!
//! Keeps a live quote table for the configured symbols and logs it periodically

use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use signaldeck_board::{render_board, BoardSettings};
use signaldeck_price_feed::PriceFeedSynchronizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let settings = BoardSettings::load()?;
    init_logging(settings.log_json);

    info!("Starting SignalDeck board v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Tracking {}",
        settings
            .feed
            .symbols
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut sync = PriceFeedSynchronizer::binance(settings.feed.clone())?;
    let board = sync.board();
    let mut updates = sync.subscribe();

    sync.activate().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut render = tokio::time::interval(settings.render_interval());

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = render.tick() => {
                info!("\n{}", render_board(&board, &settings.feed.symbols, chrono::Utc::now()));
            }
            update = updates.recv() => match update {
                Ok(quote) => debug!("{} -> {}", quote.symbol, quote.last_price),
                Err(RecvError::Lagged(skipped)) => debug!("Board listener lagged by {} updates", skipped),
                Err(RecvError::Closed) => {
                    warn!("Update channel closed");
                    break;
                }
            },
        }
    }

    sync.deactivate().await;
    info!("Shutdown complete");
    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received termination signal"),
    }
}
