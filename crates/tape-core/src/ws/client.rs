//! Single WebSocket connection with auto-reconnect.
//!
//! A `WsConnection` runs as a tokio task that:
//! 1. Connects to the feed endpoint (TLS).
//! 2. Sends the subscription message.
//! 3. Forwards each text frame to a callback.
//! 4. Answers server pings; optionally sends client keep-alive pings.
//! 5. Reconnects on disconnection with bounded exponential backoff —
//!    retries never give up; a frame in flight during a drop is lost.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Callback invoked for each received text frame.
pub type OnTextCallback = std::sync::Arc<dyn Fn(&str) + Send + Sync>;

/// Configuration for a single WebSocket connection.
#[derive(Debug, Clone)]
pub struct WsConnConfig {
    /// Full WebSocket URL (e.g. `wss://stream.binance.com:443/ws`).
    pub url: String,
    /// Message to send immediately after connection (subscription request).
    pub subscribe_msg: Option<String>,
    /// Interval between client keep-alive pings. `None` disables them.
    pub ping_interval: Option<Duration>,
    /// Reconnect backoff floor. The first retry after a drop waits this long.
    pub reconnect_floor: Duration,
    /// Reconnect backoff cap. Doubling stops here.
    pub reconnect_cap: Duration,
    /// Label used in log lines.
    pub label: String,
}

/// A single WebSocket connection managed by a background tokio task.
pub struct WsConnection {
    /// Connection configuration.
    pub config: WsConnConfig,
    /// Shutdown signal sender.
    shutdown_tx: Option<watch::Sender<bool>>,
    /// Task join handle.
    task: Option<tokio::task::JoinHandle<()>>,
}

impl WsConnection {
    /// Create a new (not yet started) connection.
    pub fn new(config: WsConnConfig) -> Self {
        Self { config, shutdown_tx: None, task: None }
    }

    /// Start the connection task. Text frames are forwarded to `on_text`.
    pub fn start(&mut self, on_text: OnTextCallback) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            connection_loop(config, on_text, shutdown_rx).await;
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
    }

    /// Stop the connection and wait for the task to finish. Aborts a
    /// pending reconnect backoff as well as an open socket.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Main connection loop — connects, subscribes, reads, reconnects.
async fn connection_loop(
    config: WsConnConfig,
    on_text: OnTextCallback,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut backoff = config.reconnect_floor;
    let label = config.label.clone();

    loop {
        // Check shutdown before connecting
        if *shutdown_rx.borrow() {
            info!("[{label}] shutdown requested");
            return;
        }

        info!("[{label}] connecting to {}", config.url);

        let ws_stream = match connect_ws(&config.url).await {
            Ok(s) => {
                backoff = config.reconnect_floor; // reset backoff on success
                info!("[{label}] connected");
                s
            }
            Err(e) => {
                error!("[{label}] connection failed: {e}, retrying in {backoff:?}");
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {},
                    _ = shutdown_rx.changed() => return,
                }
                backoff = (backoff * 2).min(config.reconnect_cap);
                continue;
            }
        };

        let (mut ws_write, mut ws_read) = ws_stream.split();

        // Send subscription message
        if let Some(ref sub_msg) = config.subscribe_msg {
            debug!("[{label}] subscribing: {sub_msg}");
            if let Err(e) = ws_write.send(Message::Text(sub_msg.clone().into())).await {
                error!("[{label}] subscribe send failed: {e}");
                continue;
            }
        }

        // Set up client ping timer
        let ping_interval = config.ping_interval.map(tokio::time::interval);

        // Pin the interval for use in select!
        tokio::pin! {
            let ping_tick = async {
                if let Some(mut interval) = ping_interval {
                    loop {
                        interval.tick().await;
                    }
                } else {
                    // No client pinging — wait forever
                    std::future::pending::<()>().await
                }
            };
        }

        // Main read loop
        loop {
            tokio::select! {
                // Shutdown signal
                _ = shutdown_rx.changed() => {
                    info!("[{label}] shutdown signal received");
                    let _ = ws_write.close().await;
                    return;
                }

                // Incoming frame
                msg = ws_read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            on_text(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = ws_write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            warn!("[{label}] received close frame");
                            break;
                        }
                        Some(Err(e)) => {
                            error!("[{label}] read error: {e}");
                            break;
                        }
                        None => {
                            warn!("[{label}] stream ended");
                            break;
                        }
                        _ => {} // Binary, Pong, Frame — ignore
                    }
                }

                // Client keep-alive
                _ = &mut ping_tick => {
                    if let Err(e) = ws_write.send(Message::Ping(vec![].into())).await {
                        error!("[{label}] ping send error: {e}");
                        break;
                    }
                }
            }
        }

        // Disconnected — will reconnect at the top of the outer loop
        warn!("[{label}] disconnected, reconnecting in {backoff:?}");
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {},
            _ = shutdown_rx.changed() => return,
        }
        backoff = (backoff * 2).min(config.reconnect_cap);
    }
}

/// Establish a TLS WebSocket connection.
async fn connect_ws(
    url: &str,
) -> anyhow::Result<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
> {
    use tokio_tungstenite::tungstenite::http::Request;

    let request = Request::builder()
        .uri(url)
        .header("Host", extract_host(url))
        .body(())?;

    let (stream, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(stream)
}

/// Extract the host from a URL string.
fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.host_str().unwrap_or("").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_extraction() {
        assert_eq!(extract_host("wss://stream.binance.com:443/ws"), "stream.binance.com");
        assert_eq!(extract_host("ws://localhost:9001/feed"), "localhost");
        assert_eq!(extract_host("not a url"), "");
    }

    #[test]
    fn backoff_doubles_to_cap() {
        let floor = Duration::from_secs(1);
        let cap = Duration::from_secs(5);
        let mut backoff = floor;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(backoff);
            backoff = (backoff * 2).min(cap);
        }
        assert_eq!(
            seen,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(5),
            ]
        );
    }
}
