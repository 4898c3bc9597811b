use std::sync::Arc;

use async_trait::async_trait;

use super::driver_type::DriverType;
use crate::error::DomainError;
use crate::protocol::Line;

/// Sink for frames produced by a transport's background reader
pub trait LineHandler: Send + Sync {
    /// A complete inbound line, terminator already stripped
    fn handle_line(&self, line: Line);

    /// The reader stopped. `reason` is `None` for an orderly close.
    /// Called at most once per open.
    fn connection_lost(&self, reason: Option<String>);
}

/// Line-framed byte link that infrastructure implementations must provide
#[async_trait]
pub trait LineTransport: Send + Sync {
    /// Open the link and start forwarding inbound lines to `handler`
    async fn open(&mut self, handler: Arc<dyn LineHandler>) -> Result<(), DomainError>;

    /// Close the link. A partially received line is discarded.
    async fn close(&mut self) -> Result<(), DomainError>;

    /// Write one line; exactly one terminator is appended
    async fn write_line(&mut self, line: &Line) -> Result<(), DomainError>;

    fn is_open(&self) -> bool;

    fn driver_type(&self) -> DriverType;
}

/// Builds a fresh, unopened transport for a port on every connect
pub trait TransportFactory: Send + Sync {
    fn create(&self, port: &str, baud_rate: u32) -> Result<Box<dyn LineTransport>, DomainError>;
}
