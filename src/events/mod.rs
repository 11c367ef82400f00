//! Change notification fan-out.
//!
//! Every successful mutation publishes a domain [`Event`]. The event is logged and
//! counted, and every connected observer receives a bare
//! [`ChangeNotification::Update`]. Observers re-read whatever they display; the
//! payload never describes what changed.

use futures::stream::{self, BoxStream, StreamExt};
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

/// Domain events raised by the reconciliation services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    GarmentCreated(Uuid),
    GarmentUpdated(Uuid),
    GarmentDeleted(Uuid),
    RentalCreated { rental_id: Uuid, garment_id: Uuid },
    RentalUpdated(Uuid),
    RentalSettled { rental_id: Uuid, garment_id: Uuid },
    RentalReopened { rental_id: Uuid, garment_id: Uuid },
    RentalDeleted(Uuid),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::GarmentCreated(_) => "garment_created",
            Event::GarmentUpdated(_) => "garment_updated",
            Event::GarmentDeleted(_) => "garment_deleted",
            Event::RentalCreated { .. } => "rental_created",
            Event::RentalUpdated(_) => "rental_updated",
            Event::RentalSettled { .. } => "rental_settled",
            Event::RentalReopened { .. } => "rental_reopened",
            Event::RentalDeleted(_) => "rental_deleted",
        }
    }
}

/// Message pushed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeNotification {
    Update,
    /// Anything a newer server might send; clients ignore it.
    #[serde(other)]
    Unknown,
}

impl ChangeNotification {
    pub fn to_json(self) -> String {
        match self {
            ChangeNotification::Update => r#"{"type":"update"}"#.to_string(),
            ChangeNotification::Unknown => r#"{"type":"unknown"}"#.to_string(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(raw).map_err(|e| ChannelError::Transport(e.to_string()))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("failed to connect notification channel: {0}")]
    Connect(String),
    #[error("notification channel transport error: {0}")]
    Transport(String),
    #[error("notification channel closed")]
    Closed,
}

/// Process-wide broadcast of change notifications.
///
/// Holds no per-observer state. Publishing with nobody listening is a no-op.
#[derive(Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<ChangeNotification>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Records `event` and notifies every current observer. Returns how many were reached.
    pub fn publish(&self, event: Event) -> usize {
        info!(event = event.name(), details = ?event, "domain event");
        counter!("rental_api.events", 1, "event" => event.name());

        match self.sender.send(ChangeNotification::Update) {
            Ok(observers) => {
                counter!("rental_api.notifications.delivered", observers as u64);
                observers
            }
            Err(_) => {
                debug!(
                    event = event.name(),
                    "no observers connected; notification dropped"
                );
                counter!("rental_api.notifications.dropped", 1);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.sender.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Notifications as a stream. A lagging observer gets one `Update` in place
    /// of everything it missed.
    pub fn stream(&self) -> BoxStream<'static, ChangeNotification> {
        notification_stream(self.subscribe())
    }
}

pub fn notification_stream(
    receiver: broadcast::Receiver<ChangeNotification>,
) -> BoxStream<'static, ChangeNotification> {
    stream::unfold(receiver, |mut rx| async move {
        match rx.recv().await {
            Ok(notification) => Some((notification, rx)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(
                    skipped,
                    "observer lagged; coalescing missed notifications"
                );
                Some((ChangeNotification::Update, rx))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    })
    .boxed()
}
