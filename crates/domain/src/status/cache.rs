use serde::{Deserialize, Serialize};

use super::field::{StatusField, StatusValue};
use crate::error::DomainError;

/// Numeric fields read -1 until the first poll answers
const UNKNOWN_READING: f64 = -1.0;

/// Point-in-time copy of every status field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub set_voltage: f64,
    pub set_current: f64,
    pub measured_voltage: f64,
    pub measured_current: f64,
    pub output_enabled: bool,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            set_voltage: UNKNOWN_READING,
            set_current: UNKNOWN_READING,
            measured_voltage: UNKNOWN_READING,
            measured_current: UNKNOWN_READING,
            output_enabled: false,
        }
    }
}

/// Change-detecting store of the last known device status.
///
/// Equality is exact for both numbers and booleans.
#[derive(Debug, Clone, Default)]
pub struct StatusCache {
    values: StatusSnapshot,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: StatusField) -> StatusValue {
        let v = &self.values;
        match field {
            StatusField::SetVoltage => StatusValue::Number(v.set_voltage),
            StatusField::SetCurrent => StatusValue::Number(v.set_current),
            StatusField::MeasuredVoltage => StatusValue::Number(v.measured_voltage),
            StatusField::MeasuredCurrent => StatusValue::Number(v.measured_current),
            StatusField::OutputEnabled => StatusValue::Bool(v.output_enabled),
        }
    }

    /// Store `value` if it differs from the cached one. Returns whether it changed.
    pub fn set(&mut self, field: StatusField, value: StatusValue) -> Result<bool, DomainError> {
        if !field.accepts(&value) {
            return Err(DomainError::Protocol(format!(
                "Value {} does not fit field {}",
                value, field
            )));
        }
        if self.get(field) == value {
            return Ok(false);
        }

        let v = &mut self.values;
        match (field, value) {
            (StatusField::SetVoltage, StatusValue::Number(n)) => v.set_voltage = n,
            (StatusField::SetCurrent, StatusValue::Number(n)) => v.set_current = n,
            (StatusField::MeasuredVoltage, StatusValue::Number(n)) => v.measured_voltage = n,
            (StatusField::MeasuredCurrent, StatusValue::Number(n)) => v.measured_current = n,
            (StatusField::OutputEnabled, StatusValue::Bool(b)) => v.output_enabled = b,
            _ => unreachable!("field kind checked above"),
        }
        Ok(true)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.values
    }
}
