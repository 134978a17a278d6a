//! Core types and utilities for the SignalDeck price feed
//!
//! This crate provides shared types used across all components:
//! - Symbol, quote and feed-health definitions
//! - Two-decimal display formatting
//! - Feed configuration
//! - Error types

pub mod types;
pub mod quotes;
pub mod config;
pub mod errors;

pub use types::*;
pub use quotes::*;
pub use config::*;
pub use errors::*;
