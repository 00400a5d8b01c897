use std::sync::Arc;

use tracing::debug;

use weave_types::events::RoomEvent;

/// Sink for room events.
///
/// Called only after the triggering change is committed. Implementations
/// must not block on delivery and must never surface transport errors.
pub trait Publisher: Send + Sync {
    fn publish(&self, event: RoomEvent);
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn publish(&self, event: RoomEvent) {
        (**self).publish(event)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn publish(&self, event: RoomEvent) {
        debug!("Dropping {} for {} (no publisher configured)", event.name(), event.room_id());
    }
}

/// Hands each event to several publishers in order.
#[derive(Default, Clone)]
pub struct Fanout {
    targets: Vec<Arc<dyn Publisher>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: Arc<dyn Publisher>) -> Self {
        self.targets.push(target);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Publisher for Fanout {
    fn publish(&self, event: RoomEvent) {
        let Some((last, rest)) = self.targets.split_last() else {
            return;
        };
        for target in rest {
            target.publish(event.clone());
        }
        last.publish(event);
    }
}
