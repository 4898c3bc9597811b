use crate::DeviceEvent;
use async_trait::async_trait;

/// Observer of device notifications (the UI layer is one such observer)
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        event: DeviceEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn publish_batch(
        &self,
        events: Vec<DeviceEvent>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
