//! Durable-queue publisher for window summaries.
//!
//! The publisher exclusively owns the broker connection: acquired at
//! pipeline start, reconnected locally on failure, released on shutdown.
//! There is no local durable buffer — a summary that cannot be published
//! is logged and dropped.

use anyhow::{Context, Result};
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tape_core::config::BrokerConfig;
use tape_core::error::TapeError;
use tape_core::{WindowSummary, time_util};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Publishes window summaries to a named durable queue.
///
/// Publisher confirms are enabled, so `publish` returning `Ok` means the
/// broker has accepted the message (at-least-once from there on).
pub struct QueuePublisher {
    uri: String,
    queue: String,
    link: Option<(Connection, Channel)>,
}

impl QueuePublisher {
    /// Connect at pipeline start and declare the queue.
    ///
    /// Failure here is fatal: an unreachable broker at startup is an
    /// operator problem, unlike the transient failures `publish` survives.
    pub async fn connect(broker: &BrokerConfig) -> Result<Self> {
        let uri = broker.amqp_uri();
        let queue = broker.queue.clone();
        let link = open_link(&uri, &queue)
            .await
            .with_context(|| format!("cannot reach broker at {}:{}", broker.host, broker.port))?;
        info!("publisher connected to {}:{} (queue '{queue}')", broker.host, broker.port);
        Ok(Self { uri, queue, link: Some(link) })
    }

    /// Serialize one summary to the wire format and publish it, awaiting
    /// the broker ack. On failure the broken link is torn down so the next
    /// publish re-establishes it; the caller decides what to log.
    pub async fn publish(&mut self, summary: &WindowSummary) -> Result<()> {
        let payload = summary.to_wire()?;
        match self.publish_inner(&payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.link = None;
                Err(e)
            }
        }
    }

    async fn publish_inner(&mut self, payload: &[u8]) -> Result<()> {
        if self.link.is_none() {
            self.link = Some(open_link(&self.uri, &self.queue).await?);
            info!("publisher reconnected (queue '{}')", self.queue);
        }
        let Some((_, channel)) = &self.link else {
            return Err(TapeError::Publish("broker link unavailable".into()).into());
        };

        let confirm = channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_delivery_mode(2) // persistent
                    .with_timestamp(time_util::now_secs()),
            )
            .await?
            .await?;

        if let Confirmation::Nack(_) = confirm {
            return Err(TapeError::Publish("broker nacked the message".into()).into());
        }
        Ok(())
    }

    /// Close the broker connection cleanly.
    pub async fn close(&mut self) {
        if let Some((connection, _)) = self.link.take() {
            if let Err(e) = connection.close(200, "shutdown").await {
                warn!("broker connection close failed: {e}");
            }
        }
    }
}

async fn open_link(uri: &str, queue: &str) -> Result<(Connection, Channel)> {
    let connection = Connection::connect(uri, ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;
    channel.confirm_select(ConfirmSelectOptions::default()).await?;
    channel
        .queue_declare(
            queue,
            QueueDeclareOptions { durable: true, ..Default::default() },
            FieldTable::default(),
        )
        .await?;
    Ok((connection, channel))
}

/// Drain window summaries and publish each one.
///
/// A failed publish drops that summary with enough context to diagnose
/// later; the loop itself never aborts. Runs until the summary channel
/// closes, then releases the broker connection.
pub async fn run_publish_loop(
    mut summaries: mpsc::Receiver<WindowSummary>,
    mut publisher: QueuePublisher,
) {
    while let Some(summary) = summaries.recv().await {
        match publisher.publish(&summary).await {
            Ok(()) => info!("published {summary}"),
            Err(e) => error!(
                "dropping window [{}..{}] ({} trades): publish failed: {e:#}",
                summary.window_start, summary.window_end, summary.trade_count
            ),
        }
    }
    publisher.close().await;
    info!("publish loop exited");
}
