use std::time::Duration;

use serde::{Deserialize, Serialize};

use domain::DomainError;

use crate::query::{DEFAULT_QUERY_TIMEOUT, as_millis_u64};

/// Device session tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Matched exchanges buffered between the poll and drain loops
    #[serde(default = "default_delivery_queue_capacity")]
    pub delivery_queue_capacity: usize,
}

fn default_baud_rate() -> u32 {
    9600
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_query_timeout_ms() -> u64 {
    as_millis_u64(DEFAULT_QUERY_TIMEOUT)
}
fn default_delivery_queue_capacity() -> usize {
    64
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            poll_interval_ms: default_poll_interval_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            delivery_queue_capacity: default_delivery_queue_capacity(),
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Reject values the poll loop cannot run with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.poll_interval_ms == 0 {
            return Err(DomainError::InvalidConfiguration(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.query_timeout_ms == 0 {
            return Err(DomainError::InvalidConfiguration(
                "query_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(DomainError::InvalidConfiguration(
                "baud_rate must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
