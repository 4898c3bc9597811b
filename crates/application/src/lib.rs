//! Application layer - Query correlation and the device session use cases

pub mod device;
pub mod query;

pub use device::{DeviceSession, SessionConfig};
pub use query::QueryEngine;
