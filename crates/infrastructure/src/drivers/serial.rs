use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_serial::SerialPortBuilderExt;

use domain::DomainError;
use domain::driver::{DriverType, LineHandler, LineTransport, TransportFactory};
use domain::protocol::Line;

use super::stream_link::StreamLink;

/// Serial port configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(default)]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: String, // "None", "Even", "Odd"
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
}

fn default_baud_rate() -> u32 {
    9600
}
fn default_data_bits() -> u8 {
    8
}
fn default_parity() -> String {
    "None".to_string()
}
fn default_stop_bits() -> u8 {
    1
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl SerialConfig {
    pub fn new(port: String) -> Self {
        Self {
            port,
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: default_parity(),
            stop_bits: default_stop_bits(),
        }
    }

    /// Check every field converts to a port setting
    pub fn validate(&self) -> Result<(), DomainError> {
        self.to_data_bits()?;
        self.to_parity()?;
        self.to_stop_bits()?;
        Ok(())
    }

    fn to_parity(&self) -> Result<tokio_serial::Parity, DomainError> {
        match self.parity.as_str() {
            "None" => Ok(tokio_serial::Parity::None),
            "Even" => Ok(tokio_serial::Parity::Even),
            "Odd" => Ok(tokio_serial::Parity::Odd),
            _ => Err(DomainError::InvalidConfiguration(format!(
                "Invalid parity: {}",
                self.parity
            ))),
        }
    }

    fn to_stop_bits(&self) -> Result<tokio_serial::StopBits, DomainError> {
        match self.stop_bits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            _ => Err(DomainError::InvalidConfiguration(format!(
                "Invalid stop bits: {}",
                self.stop_bits
            ))),
        }
    }

    fn to_data_bits(&self) -> Result<tokio_serial::DataBits, DomainError> {
        match self.data_bits {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            _ => Err(DomainError::InvalidConfiguration(format!(
                "Invalid data bits: {}",
                self.data_bits
            ))),
        }
    }

    /// Normalize port name for Windows (e.g., COM7 -> \\.\COM7)
    fn port_name(&self) -> String {
        if cfg!(target_os = "windows") && !self.port.to_uppercase().starts_with(r"\\.\") {
            format!(r"\\.\{}", self.port)
        } else {
            self.port.clone()
        }
    }
}

/// Line transport over a native serial port
pub struct SerialLineTransport {
    config: SerialConfig,
    link: Option<StreamLink>,
}

impl SerialLineTransport {
    pub fn new(config: SerialConfig) -> Self {
        Self { config, link: None }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

#[async_trait]
impl LineTransport for SerialLineTransport {
    async fn open(&mut self, handler: Arc<dyn LineHandler>) -> Result<(), DomainError> {
        if self.link.is_some() {
            return Err(DomainError::InvalidState("Serial port already open"));
        }
        let port_name = self.config.port_name();

        tracing::debug!(
            port = %port_name,
            baud_rate = self.config.baud_rate,
            "Opening serial port"
        );

        let port = tokio_serial::new(&port_name, self.config.baud_rate)
            .data_bits(self.config.to_data_bits()?)
            .parity(self.config.to_parity()?)
            .stop_bits(self.config.to_stop_bits()?)
            .open_native_async()
            .map_err(|e| {
                tracing::warn!(port = %port_name, error = %e, "Failed to open serial port");
                DomainError::Connection(format!(
                    "Failed to open serial port {}: {}. Tip: Ensure the port is not used by another application and that you have sufficient permissions.",
                    port_name, e
                ))
            })?;

        self.link = Some(StreamLink::start(port, handler));
        tracing::debug!(port = %self.config.port, "Serial port opened successfully");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DomainError> {
        if let Some(link) = self.link.take() {
            if let Err(e) = link.shutdown().await {
                tracing::warn!(error = %e, "Error shutting down serial port");
            }
            tracing::info!(port = %self.config.port, "Serial port closed");
        }
        Ok(())
    }

    async fn write_line(&mut self, line: &Line) -> Result<(), DomainError> {
        let link = self
            .link
            .as_mut()
            .ok_or_else(|| DomainError::Connection("Port not connected".to_string()))?;
        link.write_line(line).await
    }

    fn is_open(&self) -> bool {
        self.link.is_some()
    }

    fn driver_type(&self) -> DriverType {
        DriverType::Serial
    }
}

/// Builds serial transports from a template, overriding port and baud rate
#[derive(Debug, Clone, Default)]
pub struct SerialTransportFactory {
    template: SerialConfig,
}

impl SerialTransportFactory {
    pub fn new(template: SerialConfig) -> Self {
        Self { template }
    }
}

impl TransportFactory for SerialTransportFactory {
    fn create(&self, port: &str, baud_rate: u32) -> Result<Box<dyn LineTransport>, DomainError> {
        let config = SerialConfig {
            port: port.to_string(),
            baud_rate,
            ..self.template.clone()
        };
        config.validate()?;
        Ok(Box::new(SerialLineTransport::new(config)))
    }
}
