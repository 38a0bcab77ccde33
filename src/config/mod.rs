//! Configuration management
//!
//! Layered: built-in defaults, then an optional TOML file, then `RELAY__*`
//! environment variables. A bare `PORT` variable overrides the listen port.

use crate::application::SessionSettings;
use crate::domain::session::SessionCapabilities;
use config::{Environment, File};
use serde::{Deserialize, Serialize};

/// Config file used when `RELAY_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/callrelay.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub session_queue_capacity: usize,
    pub observer_queue_capacity: usize,
    pub capabilities: SessionCapabilities,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub greeting: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            relay: RelayConfig {
                session_queue_capacity: 64,
                observer_queue_capacity: 256,
                capabilities: SessionCapabilities::default(),
            },
            agent: AgentConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            metrics: MetricsConfig { enabled: true },
        }
    }
}

impl Config {
    /// Load from `RELAY_CONFIG` (or the default path) and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let port = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok());
        Self::load_from(&path, port)
    }

    /// Load from an explicit file path; `port` wins over every other source
    pub fn load_from(path: &str, port: Option<u16>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("RELAY").separator("__"));

        if let Some(port) = port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            capabilities: self.relay.capabilities,
            queue_capacity: self.relay.session_queue_capacity,
        }
    }
}
