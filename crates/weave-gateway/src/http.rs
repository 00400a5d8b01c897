use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use weave_types::events::RoomEvent;

use crate::publisher::Publisher;

/// Path the external socket server listens on for server-originated events.
const EMIT_PATH: &str = "/emit-event";

#[derive(Debug, thiserror::Error)]
enum DeliveryError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("socket server answered {0}")]
    Status(StatusCode),
}

/// Publishes room events to the external socket server over HTTP.
///
/// `publish` only enqueues. A background task drains the queue and sends
/// each event in its own task, bounded by the client timeout, so a slow or
/// unreachable server never holds up the caller. Failures are logged and
/// dropped; there is no retry.
#[derive(Clone)]
pub struct HttpPublisher {
    tx: mpsc::UnboundedSender<RoomEvent>,
}

impl HttpPublisher {
    /// Start the delivery task. Must be called from within a tokio runtime.
    pub fn spawn(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        let endpoint = format!("{}{}", base_url.trim_end_matches('/'), EMIT_PATH);

        let (tx, rx) = mpsc::unbounded_channel();
        info!("Publishing room events to {} (timeout {:?})", endpoint, timeout);
        tokio::spawn(run_delivery_loop(client, endpoint, rx));

        Ok(Self { tx })
    }
}

impl Publisher for HttpPublisher {
    fn publish(&self, event: RoomEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!("Room event delivery task is gone, dropping {}", e.0.name());
        }
    }
}

async fn run_delivery_loop(
    client: Client,
    endpoint: String,
    mut rx: mpsc::UnboundedReceiver<RoomEvent>,
) {
    while let Some(event) = rx.recv().await {
        let client = client.clone();
        let endpoint = endpoint.clone();
        tokio::spawn(async move {
            match deliver(&client, &endpoint, &event).await {
                Ok(()) => debug!("Delivered {} to {}", event.name(), event.room_id()),
                Err(e) => warn!(
                    "Failed to deliver {} to {}: {}",
                    event.name(),
                    event.room_id(),
                    e
                ),
            }
        });
    }
    debug!("Room event delivery loop stopped");
}

async fn deliver(client: &Client, endpoint: &str, event: &RoomEvent) -> Result<(), DeliveryError> {
    let response = client.post(endpoint).json(event).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DeliveryError::Status(status));
    }
    Ok(())
}
