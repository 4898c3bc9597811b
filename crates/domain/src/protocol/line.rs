use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Line terminator used in both directions
pub const TERMINATOR: u8 = b'\n';

/// One framed line of the protocol, terminator stripped.
///
/// An empty line is valid: it is what a bare terminator on the wire decodes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line(String);

impl Line {
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        if text.as_bytes().contains(&TERMINATOR) {
            return Err(DomainError::Protocol(format!(
                "Line contains an embedded terminator: {:?}",
                text
            )));
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Line {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
