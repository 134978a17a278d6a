//! Composition root for the SignalDeck ticker board
//!
//! Loads settings, wires the price feed synchronizer and renders the board

pub mod render;
pub mod settings;

pub use render::render_board;
pub use settings::BoardSettings;
