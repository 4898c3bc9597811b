use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use domain::DomainError;
use domain::driver::{DriverType, LineHandler, LineTransport, TransportFactory};
use domain::protocol::commands::{OUTPUT_OFF, OUTPUT_ON};
use domain::protocol::{Line, StatusQuery};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Delay between a query and its reply
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Resistive load on the output terminals
    #[serde(default = "default_load_ohms")]
    pub load_ohms: f64,
}

fn default_latency_ms() -> u64 {
    20
}
fn default_load_ohms() -> f64 {
    10.0
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            load_ohms: default_load_ohms(),
        }
    }
}

/// In-process bench supply speaking the line protocol.
///
/// The output regulates to the voltage setpoint until the load would draw
/// more than the current limit, then holds the current limit.
#[derive(Debug, Clone)]
pub struct SimulatedPsu {
    set_voltage: f64,
    set_current: f64,
    output_enabled: bool,
    load_ohms: f64,
}

impl SimulatedPsu {
    pub fn new(load_ohms: f64) -> Self {
        Self {
            set_voltage: 0.0,
            set_current: 0.0,
            output_enabled: false,
            load_ohms,
        }
    }

    pub fn set_voltage(&self) -> f64 {
        self.set_voltage
    }

    pub fn set_current(&self) -> f64 {
        self.set_current
    }

    pub fn output_enabled(&self) -> bool {
        self.output_enabled
    }

    pub fn measured_voltage(&self) -> f64 {
        if !self.output_enabled || self.load_ohms <= 0.0 {
            return 0.0;
        }
        self.set_voltage.min(self.set_current * self.load_ohms)
    }

    pub fn measured_current(&self) -> f64 {
        if !self.output_enabled || self.load_ohms <= 0.0 {
            return 0.0;
        }
        self.measured_voltage() / self.load_ohms
    }

    /// Apply one inbound line, returning the reply line if the command has one.
    /// Unknown or malformed input is ignored, as the hardware does.
    pub fn handle(&mut self, input: &str) -> Option<String> {
        if let Some(query) = StatusQuery::from_query_text(input) {
            let reply = match query {
                StatusQuery::Output => {
                    let state = if self.output_enabled { OUTPUT_ON } else { OUTPUT_OFF };
                    state.to_string()
                }
                StatusQuery::MeasureCurrent => format!("{:.3}", self.measured_current()),
                StatusQuery::MeasureVoltage => format!("{:.3}", self.measured_voltage()),
                StatusQuery::SetCurrent => format!("{:.3}", self.set_current),
                StatusQuery::SetVoltage => format!("{:.3}", self.set_voltage),
            };
            return Some(reply);
        }

        let (command, argument) = input.split_once(' ')?;
        match command {
            ":VOLT" => self.set_voltage = argument.trim().parse().ok()?,
            ":CURR" => self.set_current = argument.trim().parse().ok()?,
            ":OUTP" => match argument.trim() {
                OUTPUT_ON => self.output_enabled = true,
                OUTPUT_OFF => self.output_enabled = false,
                _ => return None,
            },
            _ => {}
        }
        None
    }
}

/// Transport whose far end is a [`SimulatedPsu`]
pub struct SimulatedPsuTransport {
    psu: Arc<Mutex<SimulatedPsu>>,
    latency: Duration,
    handler: Option<Arc<dyn LineHandler>>,
}

impl SimulatedPsuTransport {
    pub fn new(psu: Arc<Mutex<SimulatedPsu>>, latency: Duration) -> Self {
        Self {
            psu,
            latency,
            handler: None,
        }
    }
}

#[async_trait]
impl LineTransport for SimulatedPsuTransport {
    async fn open(&mut self, handler: Arc<dyn LineHandler>) -> Result<(), DomainError> {
        tracing::info!(latency = ?self.latency, "Simulator connected");
        self.handler = Some(handler);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DomainError> {
        if let Some(handler) = self.handler.take() {
            handler.connection_lost(None);
            tracing::info!("Simulator disconnected");
        }
        Ok(())
    }

    async fn write_line(&mut self, line: &Line) -> Result<(), DomainError> {
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| DomainError::Connection("Simulator not connected".to_string()))?;

        let reply = {
            let mut psu = self
                .psu
                .lock()
                .map_err(|_| DomainError::Connection("Simulator state poisoned".to_string()))?;
            psu.handle(line.as_str())
        };
        tracing::trace!(command = %line, reply = ?reply, "Simulator received line");

        if let Some(reply) = reply {
            let reply = Line::new(reply)?;
            let latency = self.latency;
            tokio::spawn(async move {
                if !latency.is_zero() {
                    sleep(latency).await;
                }
                handler.handle_line(reply);
            });
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.handler.is_some()
    }

    fn driver_type(&self) -> DriverType {
        DriverType::Simulator
    }
}

/// Hands out transports that all talk to the same simulated supply
#[derive(Clone)]
pub struct SimulatorFactory {
    psu: Arc<Mutex<SimulatedPsu>>,
    latency: Duration,
}

impl SimulatorFactory {
    pub fn new(config: &SimulatorConfig) -> Self {
        Self {
            psu: Arc::new(Mutex::new(SimulatedPsu::new(config.load_ohms))),
            latency: Duration::from_millis(config.latency_ms),
        }
    }

    /// Shared handle to the simulated device state
    pub fn psu(&self) -> Arc<Mutex<SimulatedPsu>> {
        self.psu.clone()
    }
}

impl TransportFactory for SimulatorFactory {
    fn create(&self, port: &str, baud_rate: u32) -> Result<Box<dyn LineTransport>, DomainError> {
        tracing::debug!(port = %port, baud_rate, "Creating simulated transport");
        Ok(Box::new(SimulatedPsuTransport::new(
            self.psu.clone(),
            self.latency,
        )))
    }
}
