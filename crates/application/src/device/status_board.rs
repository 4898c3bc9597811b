use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use domain::event::EventPublisher;
use domain::protocol::{MatchedExchange, commands};
use domain::{DeviceEvent, StatusCache, StatusField, StatusSnapshot, StatusValue};

/// Owner of the status cache and its observers.
///
/// Written only by the drain loop; read by commands and collaborators.
pub struct StatusBoard {
    cache: RwLock<StatusCache>,
    publisher: Arc<dyn EventPublisher>,
}

impl StatusBoard {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            cache: RwLock::new(StatusCache::new()),
            publisher,
        }
    }

    pub fn get(&self, field: StatusField) -> StatusValue {
        match self.cache.read() {
            Ok(cache) => cache.get(field),
            Err(poisoned) => poisoned.into_inner().get(field),
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        match self.cache.read() {
            Ok(cache) => cache.snapshot(),
            Err(poisoned) => poisoned.into_inner().snapshot(),
        }
    }

    /// Store `value` and notify observers if it differs from the cached one.
    /// Returns whether the value changed.
    pub async fn set_status(&self, field: StatusField, value: StatusValue) -> bool {
        let changed = {
            let mut cache = match self.cache.write() {
                Ok(cache) => cache,
                Err(poisoned) => poisoned.into_inner(),
            };
            cache.set(field, value)
        };

        match changed {
            Ok(true) => {
                debug!(field = %field, value = %value, "Status changed");
                self.publish(DeviceEvent::status_changed(field, value)).await;
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(field = %field, error = %e, "Rejected status update");
                false
            }
        }
    }

    /// Route a matched exchange to its field. Unknown queries and malformed
    /// replies are logged and skipped.
    pub async fn apply(&self, exchange: &MatchedExchange) -> bool {
        match commands::route(exchange) {
            Ok((field, value)) => self.set_status(field, value).await,
            Err(e) => {
                warn!(
                    query = %exchange.query_text(),
                    response = %exchange.response(),
                    error = %e,
                    "Skipping reply"
                );
                false
            }
        }
    }

    pub async fn publish(&self, event: DeviceEvent) {
        if let Err(e) = self.publisher.publish(event).await {
            warn!(error = %e, "Failed to publish event");
        }
    }
}
