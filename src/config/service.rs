//! Service identity and HTTP listen configuration

use serde::{Deserialize, Serialize};

/// Identity of the parser service and the surface it listens on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name, also announced to the registry
    #[serde(default = "default_name")]
    pub name: String,
    /// Service version segment (forms registry URLs)
    #[serde(default = "default_version")]
    pub version: String,
    /// Base path the API router is mounted under (e.g. "/openoapi/tosca/v1/")
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// IP the HTTP listener binds to
    #[serde(default = "default_bind_ip")]
    pub bind_ip: String,
    /// Port the HTTP listener binds to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Enable CORS (useful for browser-based clients)
    #[serde(default)]
    pub cors_enabled: bool,
}

fn default_name() -> String {
    "tosca".to_string()
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_base_path() -> String {
    "/".to_string()
}

fn default_bind_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            base_path: default_base_path(),
            bind_ip: default_bind_ip(),
            port: default_port(),
            cors_enabled: false,
        }
    }
}
