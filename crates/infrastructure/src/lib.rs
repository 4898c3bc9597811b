//! Infrastructure layer - Serial link, simulator and observer adapters

pub mod drivers;
pub mod messaging;

pub use drivers::{SerialConfig, SerialTransportFactory, SimulatorConfig, SimulatorFactory};
pub use messaging::{BroadcastEventPublisher, CompositeEventPublisher, LoggingEventPublisher};
