//! # tape-core
//!
//! Core crate for the tapeline system, providing:
//!
//! - **Types** (`types`) — the `Trade` and `WindowSummary` domain types
//! - **Configuration** (`config`) — JSON config deserialization + validation
//! - **Error types** (`error`) — domain-specific `TapeError` via thiserror
//! - **WebSocket** (`ws`) — feed client with auto-reconnect
//! - **Time utilities** (`time_util`) — epoch timestamps
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod time_util;
pub mod types;
pub mod ws;

// Re-export types at crate root for convenience.
pub use types::*;
