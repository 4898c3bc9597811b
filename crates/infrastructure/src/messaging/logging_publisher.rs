use async_trait::async_trait;
use domain::DeviceEvent;
use domain::event::EventPublisher;
use tracing::info;

/// Observer that writes every device event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventPublisher;

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(
        &self,
        event: DeviceEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match &event {
            DeviceEvent::StatusChanged { field, value, .. } => {
                info!(field = %field, value = %value, "📈 Status changed");
            }
            DeviceEvent::ConnectionChanged {
                connected: true, ..
            } => info!("🔌 Connected"),
            DeviceEvent::ConnectionChanged {
                connected: false,
                reason,
                ..
            } => match reason {
                Some(reason) => info!(reason = %reason, "🔌 Disconnected"),
                None => info!("🔌 Disconnected"),
            },
        }
        Ok(())
    }
}
