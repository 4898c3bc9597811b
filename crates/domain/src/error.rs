use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Transport open/close/read/write failure. Fatal to the current session.
    #[error("Connection error: {0}")]
    Connection(String),

    /// No reply arrived within the quiescence timeout
    #[error("Query timed out after {timeout_ms} ms: {query}")]
    QueryTimeout { query: String, timeout_ms: u64 },

    /// Malformed payload or a reply that cannot be routed
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Device is not connected")]
    NotConnected,

    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl DomainError {
    /// Timeouts and protocol errors are swallowed by the session loops;
    /// everything else tears the session down or is returned to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::QueryTimeout { .. } | Self::Protocol(_))
    }

    pub fn is_connection_loss(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let timeout = DomainError::QueryTimeout {
            query: ":VOLT?".to_string(),
            timeout_ms: 3000,
        };
        assert!(timeout.is_recoverable());
        assert!(DomainError::Protocol("bad float".to_string()).is_recoverable());
        assert!(!DomainError::Connection("port gone".to_string()).is_recoverable());
        assert!(!DomainError::NotConnected.is_recoverable());
    }

    #[test]
    fn test_timeout_message_names_query() {
        let err = DomainError::QueryTimeout {
            query: ":MEAS:CURR?".to_string(),
            timeout_ms: 3000,
        };
        assert_eq!(err.to_string(), "Query timed out after 3000 ms: :MEAS:CURR?");
    }
}
