//! Domain layer - Pure protocol and status model with no I/O
//!
//! This crate contains:
//! - Wire protocol vocabulary (Line, Query, MatchedExchange, StatusQuery)
//! - Status model (StatusField, StatusValue, StatusCache)
//! - Device events and the observer interface
//! - Transport interfaces (traits) implemented by infrastructure
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Testable in isolation

pub mod driver;
pub mod error;
pub mod event;
pub mod protocol;
pub mod status;

// Re-export commonly used types
pub use error::DomainError;
pub use event::DeviceEvent;
pub use protocol::{Line, MatchedExchange, Query, StatusQuery};
pub use status::{StatusCache, StatusField, StatusSnapshot, StatusValue};
