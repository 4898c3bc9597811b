pub mod broadcast_publisher;
pub mod composite_publisher;
pub mod logging_publisher;

pub use broadcast_publisher::BroadcastEventPublisher;
pub use composite_publisher::CompositeEventPublisher;
pub use logging_publisher::LoggingEventPublisher;
