mod connection_state;
mod driver_type;
mod line_transport;

pub use connection_state::ConnectionState;
pub use driver_type::DriverType;
pub use line_transport::{LineHandler, LineTransport, TransportFactory};
