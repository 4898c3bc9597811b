pub mod line_codec;
pub mod serial;
pub mod simulator;
pub mod stream_link;

pub use line_codec::LineCodec;
pub use serial::{SerialConfig, SerialLineTransport, SerialTransportFactory};
pub use simulator::{SimulatedPsu, SimulatedPsuTransport, SimulatorConfig, SimulatorFactory};
pub use stream_link::StreamLink;
