use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod publisher;
pub use publisher::EventPublisher;

use crate::status::{StatusField, StatusValue};

/// Notifications a device session broadcasts to its observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeviceEvent {
    /// A cached status field took a new value
    StatusChanged {
        field: StatusField,
        value: StatusValue,
        timestamp: DateTime<Utc>,
    },

    /// The session connected or disconnected
    ConnectionChanged {
        connected: bool,
        /// Set when the link was lost rather than closed on request
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl DeviceEvent {
    /// Create a StatusChanged event
    pub fn status_changed(field: StatusField, value: StatusValue) -> Self {
        Self::StatusChanged {
            field,
            value,
            timestamp: Utc::now(),
        }
    }

    /// Create a ConnectionChanged event for a successful connect
    pub fn connected() -> Self {
        Self::ConnectionChanged {
            connected: true,
            reason: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a ConnectionChanged event for a disconnect
    pub fn disconnected(reason: Option<String>) -> Self {
        Self::ConnectionChanged {
            connected: false,
            reason,
            timestamp: Utc::now(),
        }
    }

    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::StatusChanged { timestamp, .. } => *timestamp,
            Self::ConnectionChanged { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &str {
        match self {
            Self::StatusChanged { .. } => "StatusChanged",
            Self::ConnectionChanged { .. } => "ConnectionChanged",
        }
    }
}
