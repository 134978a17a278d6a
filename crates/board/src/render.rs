//! Plain-text ticker board

use chrono::{DateTime, Utc};
use std::fmt::Write;

use signaldeck_core::{Direction, Quote, Symbol};
use signaldeck_price_feed::PriceBoard;

const NO_DATA: &str = "—";

/// Render every tracked symbol in universe order, with a status line on top
pub fn render_board(board: &PriceBoard, symbols: &[Symbol], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let health = board.health();

    let _ = write!(out, "{} UTC  feed: {}", now.format("%H:%M:%S"), health);
    if board.is_loading() {
        out.push_str("  (loading…)");
    } else if health.is_degraded() {
        out.push_str("  [data may be stale]");
    }

    for symbol in symbols {
        out.push('\n');
        out.push_str(&render_row(symbol, board.get(symbol).as_ref()));
    }

    out
}

/// One board line; consumers infer the sign from the numbers, the quote does not store it
pub fn render_row(symbol: &Symbol, quote: Option<&Quote>) -> String {
    let Some(quote) = quote else {
        return format!("{:<10} {:>14}", symbol.as_str(), NO_DATA);
    };

    let direction = quote.direction();
    format!(
        "{:<10} {:>14} {} {:>12} ({}%)",
        symbol.as_str(),
        quote.last_price,
        direction.marker(),
        signed(&quote.absolute_change, direction),
        signed(&quote.percent_change, direction),
    )
}

fn signed(value: &str, direction: Direction) -> String {
    if direction == Direction::Up && !value.starts_with('-') {
        format!("+{value}")
    } else {
        value.to_string()
    }
}
