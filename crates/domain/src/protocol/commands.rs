//! Wire vocabulary of the supply: status queries, setpoint commands and
//! the routing table that turns a matched reply into a typed status update.

use serde::{Deserialize, Serialize};

use super::line::Line;
use super::query::{MatchedExchange, Query};
use crate::error::DomainError;
use crate::status::{StatusField, StatusValue};

/// Token the device answers `:OUTP?` with when the output is enabled
pub const OUTPUT_ON: &str = "ON";
pub const OUTPUT_OFF: &str = "OFF";

/// Status queries, each answered by a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusQuery {
    Output,
    MeasureCurrent,
    MeasureVoltage,
    SetCurrent,
    SetVoltage,
}

impl StatusQuery {
    /// Order in which one poll cycle issues the queries
    pub const POLL_ORDER: [StatusQuery; 5] = [
        Self::Output,
        Self::MeasureCurrent,
        Self::MeasureVoltage,
        Self::SetCurrent,
        Self::SetVoltage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Output => ":OUTP?",
            Self::MeasureCurrent => ":MEAS:CURR?",
            Self::MeasureVoltage => ":MEAS:VOLT?",
            Self::SetCurrent => ":CURR?",
            Self::SetVoltage => ":VOLT?",
        }
    }

    /// Exact-text lookup used to route replies
    pub fn from_query_text(text: &str) -> Option<Self> {
        match text {
            ":OUTP?" => Some(Self::Output),
            ":MEAS:CURR?" => Some(Self::MeasureCurrent),
            ":MEAS:VOLT?" => Some(Self::MeasureVoltage),
            ":CURR?" => Some(Self::SetCurrent),
            ":VOLT?" => Some(Self::SetVoltage),
            _ => None,
        }
    }

    pub fn field(&self) -> StatusField {
        match self {
            Self::Output => StatusField::OutputEnabled,
            Self::MeasureCurrent => StatusField::MeasuredCurrent,
            Self::MeasureVoltage => StatusField::MeasuredVoltage,
            Self::SetCurrent => StatusField::SetCurrent,
            Self::SetVoltage => StatusField::SetVoltage,
        }
    }

    pub fn to_query(&self) -> Query {
        Query::request(self.as_str())
    }

    pub fn parse_reply(&self, reply: &Line) -> Result<StatusValue, DomainError> {
        match self {
            Self::Output => Ok(parse_on_off(reply)),
            _ => parse_number(reply),
        }
    }
}

/// `:VOLT <v>` with three decimals
pub fn set_voltage(volts: f64) -> Query {
    Query::command(format!(":VOLT {:.3}", volts))
}

/// `:CURR <i>` with three decimals
pub fn set_current(amps: f64) -> Query {
    Query::command(format!(":CURR {:.3}", amps))
}

pub fn set_output(enabled: bool) -> Query {
    let state = if enabled { OUTPUT_ON } else { OUTPUT_OFF };
    Query::command(format!(":OUTP {}", state))
}

/// `ON` is true, anything else is false.
pub fn parse_on_off(reply: &Line) -> StatusValue {
    StatusValue::Bool(reply.as_str().trim() == OUTPUT_ON)
}

pub fn parse_number(reply: &Line) -> Result<StatusValue, DomainError> {
    let text = reply.as_str().trim();
    let value: f64 = text
        .parse()
        .map_err(|e| DomainError::Protocol(format!("Invalid numeric reply {:?}: {}", text, e)))?;
    if !value.is_finite() {
        return Err(DomainError::Protocol(format!(
            "Non-finite numeric reply {:?}",
            text
        )));
    }
    Ok(StatusValue::Number(value))
}

/// Resolve a matched exchange to the field it updates.
///
/// Unknown query texts are reported as a protocol error rather than a panic.
pub fn route(exchange: &MatchedExchange) -> Result<(StatusField, StatusValue), DomainError> {
    let query = StatusQuery::from_query_text(exchange.query_text()).ok_or_else(|| {
        DomainError::Protocol(format!("Unknown query: {}", exchange.query_text()))
    })?;
    let value = query.parse_reply(exchange.response())?;
    Ok((query.field(), value))
}
