use serde::{Deserialize, Serialize};

use super::line::Line;

/// Outgoing command text plus whether the device answers it.
///
/// The text itself is the correlation identity; the protocol carries no IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    text: String,
    expects_response: bool,
}

impl Query {
    /// A query the device answers with exactly one line
    pub fn request(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            expects_response: true,
        }
    }

    /// A fire-and-forget command; the device sends no confirmation
    pub fn command(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            expects_response: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expects_response(&self) -> bool {
        self.expects_response
    }
}

/// A query paired with the reply that resolved it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedExchange {
    query_text: String,
    response: Line,
}

impl MatchedExchange {
    pub fn new(query_text: impl Into<String>, response: Line) -> Self {
        Self {
            query_text: query_text.into(),
            response,
        }
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn response(&self) -> &Line {
        &self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_and_command_flags() {
        let q = Query::request(":VOLT?");
        assert!(q.expects_response());
        assert_eq!(q.text(), ":VOLT?");

        let c = Query::command(":OUTP ON");
        assert!(!c.expects_response());
    }
}
