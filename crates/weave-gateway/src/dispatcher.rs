use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{trace, warn};

use weave_types::events::RoomEvent;
use weave_types::models::RoomId;

use crate::publisher::Publisher;

const CHANNEL_CAPACITY: usize = 1024;

/// A room event with its JSON rendering, serialized once for all receivers.
#[derive(Debug, Clone)]
pub struct RoomMessage {
    pub room_id: RoomId,
    pub event: RoomEvent,
    pub json: Arc<str>,
}

/// In-process room fan-out. Every subscriber sees every event; room
/// filtering happens on the receiving side.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<RoomMessage>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to events for all rooms.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomMessage> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Subscribe to the events of a single room.
    pub fn join(&self, room_id: RoomId) -> RoomSubscription {
        RoomSubscription {
            room_id,
            rx: self.subscribe(),
        }
    }

    /// Number of live subscribers across all rooms.
    pub fn receiver_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }

    /// Broadcast an event to all subscribers. Having none is not an error.
    pub fn broadcast(&self, event: RoomEvent) {
        let json: Arc<str> = match serde_json::to_string(&event) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!("Failed to serialize {}: {}", event.name(), e);
                return;
            }
        };

        let message = RoomMessage {
            room_id: event.room_id().clone(),
            event,
            json,
        };

        if self.inner.broadcast_tx.send(message).is_err() {
            trace!("No in-process subscribers for room event");
        }
    }
}

impl Publisher for Dispatcher {
    fn publish(&self, event: RoomEvent) {
        self.broadcast(event);
    }
}

/// Receiver that yields only the events of one room.
pub struct RoomSubscription {
    room_id: RoomId,
    rx: broadcast::Receiver<RoomMessage>,
}

impl RoomSubscription {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Wait for the next event in this room. Returns `None` once the
    /// dispatcher is gone.
    pub async fn recv(&mut self) -> Option<RoomMessage> {
        loop {
            match self.rx.recv().await {
                Ok(msg) if msg.room_id == self.room_id => return Some(msg),
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => {
                    warn!("Room {} receiver lagged by {} messages", self.room_id, n);
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-queued event in this room, if any.
    pub fn try_recv(&mut self) -> Option<RoomMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) if msg.room_id == self.room_id => return Some(msg),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(n)) => {
                    warn!("Room {} receiver lagged by {} messages", self.room_id, n);
                    continue;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn accepted(document_id: Uuid) -> RoomEvent {
        RoomEvent::CollaboratorAccepted {
            document_id,
            room_id: RoomId::for_document(document_id),
            user: "Ana".into(),
            user_id: Uuid::new_v4(),
            email: "ana@example.com".into(),
            timestamp: 0,
        }
    }

    #[test]
    fn broadcast_without_subscribers_does_not_fail() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.receiver_count(), 0);
        dispatcher.broadcast(accepted(Uuid::new_v4()));
    }

    #[test]
    fn room_subscription_filters_other_rooms() {
        let dispatcher = Dispatcher::new();
        let ours = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let mut sub = dispatcher.join(RoomId::for_document(ours));

        dispatcher.publish(accepted(theirs));
        dispatcher.publish(accepted(ours));

        let msg = sub.try_recv().expect("event for our room");
        assert_eq!(msg.room_id, RoomId::for_document(ours));
        assert!(msg.json.contains("collaboratorAccepted"));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn recv_waits_for_room_event() {
        let dispatcher = Dispatcher::new();
        let document_id = Uuid::new_v4();
        let mut sub = dispatcher.join(RoomId::for_document(document_id));

        let publisher = dispatcher.clone();
        tokio::spawn(async move {
            publisher.publish(accepted(Uuid::new_v4()));
            publisher.publish(accepted(document_id));
        });

        let msg = sub.recv().await.expect("dispatcher alive");
        assert_eq!(sub.room_id(), &msg.room_id);
    }
}
