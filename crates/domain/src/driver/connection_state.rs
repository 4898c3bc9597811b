use serde::{Deserialize, Serialize};

/// Connection state of a device session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// No link open; poll and drain loops are idle
    #[default]
    Disconnected,
    /// Link open; poll and drain loops are running
    Connected,
}

impl ConnectionState {
    /// Check if state allows connection attempt
    pub fn can_connect(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Transition to connected state
    pub fn to_connected(&self) -> Result<Self, &'static str> {
        match self {
            Self::Disconnected => Ok(Self::Connected),
            Self::Connected => Err("Can only connect from Disconnected state"),
        }
    }

    /// Transition to disconnected state
    pub fn to_disconnected(&self) -> Self {
        Self::Disconnected
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
        }
    }
}
