//! Tumbling-window aggregation.
//!
//! Admitted trades are folded into a running accumulator; a fixed
//! wall-clock period closes the window and emits one [`WindowSummary`].
//! Trade arrival and the period timer are two independent event sources,
//! serialized through a single `select!` loop that exclusively owns the
//! accumulator — the running sums are never touched from two tasks.
//!
//! Windows are tumbling: contiguous, non-overlapping, strictly
//! time-bounded. A trade processed after a boundary fires belongs to the
//! next window, even if its event timestamp would have placed it earlier.

use std::time::Duration;

use tape_core::{Trade, WindowSummary};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Running sums for the window currently being accumulated.
///
/// `window_start` is the event timestamp of the first admitted trade,
/// `window_end` of the most recent one — window bounds follow the data;
/// the wall clock only decides when the window closes.
#[derive(Debug, Default)]
pub struct WindowAccumulator {
    weighted_price_sum: f64,
    total_quantity: f64,
    trade_count: u64,
    window_start: u64,
    window_end: u64,
}

impl WindowAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one admitted trade into the running sums.
    pub fn record(&mut self, trade: &Trade) {
        if self.trade_count == 0 {
            self.window_start = trade.event_time_ms;
        }
        self.window_end = trade.event_time_ms;
        self.weighted_price_sum += trade.price * trade.quantity;
        self.total_quantity += trade.quantity;
        self.trade_count += 1;
    }

    /// Close the current window: emit its summary and reset.
    ///
    /// Returns `None` for a window with no admitted trades — empty windows
    /// are suppressed, nothing null-valued ever reaches the queue.
    pub fn drain(&mut self) -> Option<WindowSummary> {
        if self.trade_count == 0 {
            return None;
        }
        let summary = WindowSummary {
            average_price: self.weighted_price_sum / self.total_quantity,
            total_quantity: self.total_quantity,
            window_start: self.window_start,
            window_end: self.window_end,
            trade_count: self.trade_count,
        };
        *self = Self::default();
        Some(summary)
    }

    pub fn is_empty(&self) -> bool {
        self.trade_count == 0
    }
}

/// Drain admitted trades and close a window every `period`.
///
/// The single consumer of both event sources: trades from `trades`,
/// boundaries from the interval (first boundary one full period after
/// start). On shutdown — or when the trade channel closes — the partial
/// window is flushed before the task returns.
pub async fn run_window_loop(
    mut trades: mpsc::Receiver<Trade>,
    period: Duration,
    summaries: mpsc::Sender<WindowSummary>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut accum = WindowAccumulator::new();
    let mut boundary = time::interval_at(time::Instant::now() + period, period);
    boundary.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("window loop started (period {period:?})");

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                info!("window loop: shutdown signal received");
                break;
            }

            maybe_trade = trades.recv() => {
                match maybe_trade {
                    Some(trade) => accum.record(&trade),
                    None => {
                        info!("window loop: trade channel closed");
                        break;
                    }
                }
            }

            _ = boundary.tick() => {
                match accum.drain() {
                    Some(summary) => {
                        debug!("window closed: {summary}");
                        if summaries.send(summary).await.is_err() {
                            warn!("summary channel closed, stopping window loop");
                            return;
                        }
                    }
                    None => debug!("window closed with no admitted trades, nothing to emit"),
                }
            }
        }
    }

    // Flush the partial window on the way out.
    if let Some(summary) = accum.drain() {
        debug!("flushing partial window: {summary}");
        let _ = summaries.send(summary).await;
    }
    info!("window loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(price: f64, quantity: f64, event_time_ms: u64) -> Trade {
        Trade { symbol: "BTCUSDT".into(), price, quantity, event_time_ms }
    }

    #[test]
    fn weighted_average_fixture() {
        let mut accum = WindowAccumulator::new();
        accum.record(&trade(100.0, 1.0, 1000));
        accum.record(&trade(200.0, 1.0, 1001));

        let summary = accum.drain().unwrap();
        assert!((summary.average_price - 150.0).abs() < 1e-9);
        assert!((summary.total_quantity - 2.0).abs() < 1e-9);
        assert_eq!(summary.window_start, 1000);
        assert_eq!(summary.window_end, 1001);
        assert_eq!(summary.trade_count, 2);
    }

    #[test]
    fn average_is_quantity_weighted() {
        let mut accum = WindowAccumulator::new();
        accum.record(&trade(100.0, 3.0, 1000));
        accum.record(&trade(200.0, 1.0, 1001));

        let summary = accum.drain().unwrap();
        // (100*3 + 200*1) / 4 = 125, not the unweighted 150.
        assert!((summary.average_price - 125.0).abs() < 1e-9);
    }

    #[test]
    fn empty_window_is_suppressed() {
        let mut accum = WindowAccumulator::new();
        assert!(accum.is_empty());
        assert!(accum.drain().is_none());
    }

    #[test]
    fn drain_resets_for_next_window() {
        let mut accum = WindowAccumulator::new();
        accum.record(&trade(100.0, 1.0, 1000));
        assert!(accum.drain().is_some());
        assert!(accum.drain().is_none());

        accum.record(&trade(500.0, 2.0, 2000));
        let summary = accum.drain().unwrap();
        assert_eq!(summary.window_start, 2000);
        assert_eq!(summary.trade_count, 1);
    }

    #[test]
    fn consecutive_windows_are_contiguous() {
        let mut accum = WindowAccumulator::new();
        accum.record(&trade(100.0, 1.0, 1000));
        accum.record(&trade(100.0, 1.0, 1500));
        let first = accum.drain().unwrap();

        accum.record(&trade(100.0, 1.0, 1500));
        accum.record(&trade(100.0, 1.0, 2200));
        let second = accum.drain().unwrap();

        assert!(second.window_start >= first.window_end);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_emits_at_boundary_and_flushes_on_shutdown() {
        let (trade_tx, trade_rx) = mpsc::channel(16);
        let (summary_tx, mut summary_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_window_loop(
            trade_rx,
            Duration::from_secs(30),
            summary_tx,
            shutdown_rx,
        ));

        trade_tx.send(trade(100.0, 1.0, 1000)).await.unwrap();
        trade_tx.send(trade(200.0, 1.0, 1001)).await.unwrap();

        // Cross the first boundary.
        time::sleep(Duration::from_secs(31)).await;
        let first = summary_rx.recv().await.unwrap();
        assert_eq!(first.trade_count, 2);
        assert!((first.average_price - 150.0).abs() < 1e-9);
        assert_eq!(first.window_start, 1000);
        assert_eq!(first.window_end, 1001);

        // Processed after the boundary — belongs to the next window, even
        // though its event timestamp is earlier.
        trade_tx.send(trade(300.0, 2.0, 900)).await.unwrap();
        time::sleep(Duration::from_millis(1)).await;

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let flushed = summary_rx.recv().await.unwrap();
        assert_eq!(flushed.trade_count, 1);
        assert_eq!(flushed.window_start, 900);
        assert!((flushed.average_price - 300.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_boundary_emits_nothing() {
        let (_trade_tx, trade_rx) = mpsc::channel::<Trade>(16);
        let (summary_tx, mut summary_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_window_loop(
            trade_rx,
            Duration::from_secs(30),
            summary_tx,
            shutdown_rx,
        ));

        // Two full periods with no trades at all.
        time::sleep(Duration::from_secs(61)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(summary_rx.recv().await.is_none());
    }
}
