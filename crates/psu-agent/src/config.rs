use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use application::SessionConfig;
use infrastructure::{SerialConfig, SimulatorConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Talk to an in-process supply instead of a serial port
    #[serde(default)]
    pub simulate: bool,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

fn default_log_filter() -> String {
    "info,psu_agent=debug,application=debug".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            session: SessionConfig::default(),
            log_filter: default_log_filter(),
            simulate: false,
            simulator: SimulatorConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::load_with_mode(config_dir, &run_mode)
    }

    pub fn load_with_mode(config_dir: &str, run_mode: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // e.g. LABPSU__SERIAL__PORT=/dev/ttyACM0
            .add_source(
                Environment::with_prefix("LABPSU")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
