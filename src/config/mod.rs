//! Configuration for the parser REST daemon

mod daemon;
mod logging;
mod msb;
mod service;

pub use daemon::DaemonConfig;
pub use logging::{init_tracing, LogFormat, LogLevel, LoggingConfig};
pub use msb::MsbConfig;
pub use service::ServiceConfig;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

/// Main configuration for one deployable of the parser service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service identity and listen surface
    #[serde(default)]
    pub service: ServiceConfig,
    /// Daemon supervision settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// MSB registry settings (absent for the plain variant)
    #[serde(default)]
    pub msb: Option<MsbConfig>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            daemon: DaemonConfig::default(),
            msb: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass rather than playing whack-a-mole.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Service validation
        if self.service.name.is_empty() {
            errors.push("service name must not be empty".to_string());
        }
        if self.service.version.is_empty() {
            errors.push("service version must not be empty".to_string());
        }
        if !self.service.base_path.starts_with('/') {
            errors.push(format!(
                "base_path must start with '/', got '{}'",
                self.service.base_path
            ));
        }
        if self.service.bind_ip.parse::<IpAddr>().is_err() {
            errors.push(format!(
                "bind_ip must be a valid IP address, got '{}'",
                self.service.bind_ip
            ));
        }
        if self.service.port == 0 {
            errors.push("service port must be positive".to_string());
        }

        // Daemon validation
        if self.daemon.acquire_timeout_secs == 0 {
            errors.push("acquire_timeout_secs must be positive".to_string());
        }
        if self.daemon.stop_poll_ms == 0 {
            errors.push("stop_poll_ms must be positive".to_string());
        }

        // MSB validation (only when the section is present)
        if let Some(msb) = &self.msb {
            if msb.host.is_empty() {
                errors.push("msb host must not be empty".to_string());
            }
            if msb.port == 0 {
                errors.push("msb port must be positive".to_string());
            }
            if !msb.register_path.starts_with('/') {
                errors.push(format!(
                    "msb register_path must start with '/', got '{}'",
                    msb.register_path
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
