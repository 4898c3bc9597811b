use serde::{Deserialize, Serialize};

/// Kind of line transport backing a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverType {
    Serial,
    Simulator,
}

impl DriverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Serial => "Serial",
            Self::Simulator => "Simulator",
        }
    }
}
