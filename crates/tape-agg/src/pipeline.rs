//! Pipeline wiring and lifecycle.
//!
//! Owns the stage topology: the WebSocket callback decodes and filters
//! each frame, admitted trades flow through a bounded channel into the
//! window loop, and closed windows flow through a second channel into the
//! publish loop. The socket callback never blocks — a full trade channel
//! drops the trade with a warning instead of stalling the read loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tape_core::config::AppConfig;
use tape_core::ws::{OnTextCallback, WsConnConfig, WsConnection};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, trace, warn};

use crate::binance::json_parser;
use crate::filter::NotionalFilter;
use crate::publish::{QueuePublisher, run_publish_loop};
use crate::window::run_window_loop;

const TRADE_CHANNEL_CAPACITY: usize = 8192;
const SUMMARY_CHANNEL_CAPACITY: usize = 64;

/// A running aggregation pipeline.
pub struct Pipeline {
    conn: WsConnection,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Wire up and start every stage.
    ///
    /// Fails fast if the broker is unreachable; the feed connection
    /// retries on its own and needs no such check.
    pub async fn start(config: &AppConfig) -> Result<Self> {
        let publisher = QueuePublisher::connect(&config.broker).await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (trade_tx, trade_rx) = mpsc::channel(TRADE_CHANNEL_CAPACITY);
        let (summary_tx, summary_rx) = mpsc::channel(SUMMARY_CHANNEL_CAPACITY);

        let filter = NotionalFilter::new(config.filter.min_notional);
        let on_text: OnTextCallback = Arc::new(move |text: &str| {
            let Some(trade) = json_parser::parse_message(text) else {
                return;
            };
            if !filter.admit(&trade) {
                trace!("filtered out {trade}");
                return;
            }
            if trade_tx.try_send(trade).is_err() {
                warn!("trade channel full, dropping trade");
            }
        });

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(run_window_loop(
            trade_rx,
            Duration::from_secs(config.window.period_sec),
            summary_tx,
            shutdown_rx,
        )));
        tasks.push(tokio::spawn(run_publish_loop(summary_rx, publisher)));

        let mut conn = WsConnection::new(WsConnConfig {
            url: config.feed.url.clone(),
            subscribe_msg: Some(json_parser::build_subscribe(&config.feed.pairs)),
            ping_interval: config.feed.ping_interval_sec.map(Duration::from_secs),
            reconnect_floor: Duration::from_millis(config.feed.reconnect_floor_ms),
            reconnect_cap: Duration::from_millis(config.feed.reconnect_cap_ms),
            label: config.module_name(),
        });
        conn.start(on_text);

        info!(
            "pipeline started ({} pair(s), {}s windows, queue '{}')",
            config.feed.pairs.len(),
            config.window.period_sec,
            config.broker.queue
        );
        Ok(Self { conn, shutdown_tx, tasks })
    }

    /// Stop every stage in order: the feed first (no new trades), then the
    /// window loop (flushes the partial window), then the publish loop
    /// (drains remaining summaries and closes the broker connection).
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);
        self.conn.stop().await;
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("pipeline task ended abnormally: {e}");
            }
        }
        info!("pipeline stopped");
    }
}
