use async_trait::async_trait;
use domain::DeviceEvent;
use domain::event::EventPublisher;
use tokio::sync::broadcast;

/// Observer backed by a tokio broadcast channel so any number of
/// consumers can subscribe to device events
#[derive(Clone)]
pub struct BroadcastEventPublisher {
    tx: broadcast::Sender<DeviceEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(
        &self,
        event: DeviceEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // No subscribers is not an error; the event simply has no audience
        if self.tx.send(event).is_err() {
            tracing::trace!("Device event dropped, no subscribers");
        }
        Ok(())
    }
}
