//! Typed error definitions for the tapeline system.
//!
//! Provides [`TapeError`] for domain-specific errors that are more informative
//! than plain `anyhow::Error` strings. All variants implement `std::error::Error`
//! via `thiserror`, so they integrate seamlessly with `anyhow::Result`.

use thiserror::Error;

/// Domain-specific errors for the tapeline system.
#[derive(Debug, Error)]
pub enum TapeError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// WebSocket connection, handshake, or communication error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Trade frame decoding error.
    #[error("decode error: {0}")]
    Decode(String),

    /// Broker publish error.
    #[error("publish error: {0}")]
    Publish(String),
}
