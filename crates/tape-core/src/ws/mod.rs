//! WebSocket feed connectivity.

pub mod client;

pub use client::{OnTextCallback, WsConnConfig, WsConnection};
