use std::fmt;

use serde::{Deserialize, Serialize};

/// One typed reading tracked by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusField {
    SetVoltage,
    SetCurrent,
    MeasuredVoltage,
    MeasuredCurrent,
    OutputEnabled,
}

impl StatusField {
    pub const ALL: [StatusField; 5] = [
        Self::SetVoltage,
        Self::SetCurrent,
        Self::MeasuredVoltage,
        Self::MeasuredCurrent,
        Self::OutputEnabled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetVoltage => "set_voltage",
            Self::SetCurrent => "set_current",
            Self::MeasuredVoltage => "measured_voltage",
            Self::MeasuredCurrent => "measured_current",
            Self::OutputEnabled => "output_enabled",
        }
    }

    /// Whether the field holds a boolean rather than a number
    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::OutputEnabled)
    }

    pub fn accepts(&self, value: &StatusValue) -> bool {
        self.is_boolean() == matches!(value, StatusValue::Bool(_))
    }
}

impl fmt::Display for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last known value of a [`StatusField`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    Number(f64),
    Bool(bool),
}

impl StatusValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Bool(true) => f.write_str("ON"),
            Self::Bool(false) => f.write_str("OFF"),
        }
    }
}

impl From<f64> for StatusValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for StatusValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
