mod config;
mod session;
mod status_board;
mod workers;

pub use config::SessionConfig;
pub use session::DeviceSession;
pub use status_board::StatusBoard;
