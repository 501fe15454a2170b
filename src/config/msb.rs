//! Open-O MSB registry configuration

use serde::{Deserialize, Serialize};

/// Location of the Open-O Microservice Bus the service registers with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsbConfig {
    /// Registry host (IP or name reachable from this node)
    #[serde(default)]
    pub host: String,
    /// Registry port
    #[serde(default = "default_msb_port")]
    pub port: u16,
    /// Path of the service-registration collection on the registry
    #[serde(default = "default_register_path")]
    pub register_path: String,
}

fn default_msb_port() -> u16 {
    80
}

fn default_register_path() -> String {
    "/openoapi/microservices/v1/services".to_string()
}

impl Default for MsbConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_msb_port(),
            register_path: default_register_path(),
        }
    }
}
