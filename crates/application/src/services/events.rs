use tokio::sync::broadcast;
use tracing::debug;

const EVENT_BUFFER: usize = 64;

/// Notifications published by the blocking engine for whoever listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Totals reloaded from the domain store.
    BlockListCountChanged { blocked: u64, allowed: u64 },
    /// Block lists or the allow list were changed out of band.
    SetupChanged,
    /// A refresh of every enabled list was queued.
    UpdateRequested,
}

/// Fan-out channel for [`EngineEvent`]. Publishing never blocks and never
/// fails; events sent while nobody subscribes are dropped.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    pub fn publish(&self, event: EngineEvent) {
        if self.sender.send(event.clone()).is_err() {
            debug!(?event, "No event subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_see_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(EngineEvent::UpdateRequested);
        bus.publish(EngineEvent::BlockListCountChanged {
            blocked: 3,
            allowed: 2,
        });
        assert_eq!(rx.recv().await.unwrap(), EngineEvent::UpdateRequested);
        assert_eq!(
            rx.recv().await.unwrap(),
            EngineEvent::BlockListCountChanged {
                blocked: 3,
                allowed: 2
            }
        );
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        EventBus::new().publish(EngineEvent::SetupChanged);
    }
}
