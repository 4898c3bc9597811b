use async_trait::async_trait;
use domain::DeviceEvent;
use domain::event::EventPublisher;
use std::sync::Arc;

/// Fans one event out to every registered observer
pub struct CompositeEventPublisher {
    publishers: Vec<Arc<dyn EventPublisher>>,
}

impl CompositeEventPublisher {
    pub fn new(publishers: Vec<Arc<dyn EventPublisher>>) -> Self {
        Self { publishers }
    }

    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }
}

#[async_trait]
impl EventPublisher for CompositeEventPublisher {
    async fn publish(
        &self,
        event: DeviceEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for publisher in &self.publishers {
            if let Err(e) = publisher.publish(event.clone()).await {
                // One failing observer must not starve the rest
                tracing::error!(error = %e, "Failed to publish event to an observer");
            }
        }
        Ok(())
    }
}
