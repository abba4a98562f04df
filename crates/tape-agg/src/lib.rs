//! # tape-agg
//!
//! The aggregation pipeline: decodes trade frames from the feed, screens
//! them by notional value, folds admitted trades into tumbling windows,
//! and publishes each window's summary to a durable queue.
//!
//! ## Architecture
//!
//! Stages are wired by [`pipeline::Pipeline`]:
//!
//! ```text
//! WsConnection ──► parse_message ──► NotionalFilter ──► trade channel
//!     ──► run_window_loop ──► summary channel ──► run_publish_loop ──► queue
//! ```
//!
//! Per-message failures (decode, filter-reject, publish) are contained at
//! their stage; only broker unavailability at startup is fatal.

pub mod binance;
pub mod filter;
pub mod pipeline;
pub mod publish;
pub mod window;
