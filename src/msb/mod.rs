//! MSB Service Registration
//!
//! Announces the service to the Open-O Microservice Bus so clients can
//! reach it through the registry. Registration is all-or-nothing at
//! startup: anything but a 201 aborts the start. Removal on shutdown is
//! best-effort; a failed removal is only warned about because the
//! registry's own health checks reap stale entries.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{MsbConfig, ServiceConfig};

/// Service descriptor in the registry's wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub service_name: String,
    pub version: String,
    pub url: String,
    pub protocol: String,
    pub visual_range: String,
    pub nodes: Vec<ServiceNode>,
}

/// One node entry in the descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceNode {
    pub ip: String,
    /// Decimal string, not a number; the registry requires it quoted
    pub port: String,
}

/// Registration failures
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry answered with something other than 201
    #[error("registry rejected the registration with status {status}")]
    Rejected { status: StatusCode },
    /// The registry could not be reached
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Registers the service with the MSB and removes it on shutdown.
pub struct ServiceRegistration {
    service_name: String,
    service_version: String,
    service_ip: String,
    service_port: u16,
    registry_url: String,
    is_registered: bool,
    client: reqwest::Client,
}

impl ServiceRegistration {
    pub fn new(msb: &MsbConfig, service: &ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build MSB registry client")?;

        Ok(Self {
            service_name: service.name.clone(),
            service_version: service.version.clone(),
            service_ip: service.bind_ip.clone(),
            service_port: service.port,
            registry_url: format!("http://{}:{}{}", msb.host, msb.port, msb.register_path),
            is_registered: false,
            client,
        })
    }

    /// Descriptor announced to the registry.
    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor {
            service_name: self.service_name.clone(),
            version: self.service_version.clone(),
            url: format!("/openoapi/{}/{}", self.service_name, self.service_version),
            protocol: "REST".to_string(),
            visual_range: "1".to_string(),
            nodes: vec![ServiceNode {
                ip: self.service_ip.clone(),
                port: self.service_port.to_string(),
            }],
        }
    }

    pub fn is_registered(&self) -> bool {
        self.is_registered
    }

    /// Announce the service. Anything but 201 is fatal.
    pub async fn register(&mut self) -> Result<(), RegistryError> {
        info!(
            "Registering '{}' with MSB at {}",
            self.service_name, self.registry_url
        );

        let response = self
            .client
            .post(&self.registry_url)
            .json(&self.descriptor())
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(RegistryError::Rejected {
                status: response.status(),
            });
        }

        self.is_registered = true;
        info!("Registered '{}' with MSB", self.service_name);
        Ok(())
    }

    /// Remove the registration. Never fatal: the worker is already
    /// stopped by the time this runs.
    pub async fn unregister(&mut self) {
        let url = self.removal_url();
        match self.client.delete(&url).send().await {
            Ok(response) if response.status() == StatusCode::NO_CONTENT => {
                info!("Unregistered '{}' from MSB", self.service_name);
            }
            Ok(response) => {
                warn!(
                    "MSB returned status {} on unregistration of '{}'",
                    response.status(),
                    self.service_name
                );
            }
            Err(e) => {
                warn!("Failed to reach MSB for unregistration: {}", e);
            }
        }
        self.is_registered = false;
    }

    fn removal_url(&self) -> String {
        format!(
            "{}/{}/version/{}/nodes/{}/{}",
            self.registry_url,
            self.service_name,
            self.service_version,
            self.service_ip,
            self.service_port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> ServiceRegistration {
        let msb = MsbConfig {
            host: "10.1.1.1".to_string(),
            port: 80,
            register_path: "/openoapi/microservices/v1/services".to_string(),
        };
        let service = ServiceConfig {
            name: "tosca".to_string(),
            version: "v1".to_string(),
            base_path: "/openoapi/tosca/v1/".to_string(),
            bind_ip: "10.0.0.1".to_string(),
            port: 8204,
            cors_enabled: false,
        };
        ServiceRegistration::new(&msb, &service).unwrap()
    }

    #[test]
    fn descriptor_matches_registry_wire_format() {
        let descriptor = registration().descriptor();
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "serviceName": "tosca",
                "version": "v1",
                "url": "/openoapi/tosca/v1",
                "protocol": "REST",
                "visualRange": "1",
                "nodes": [{"ip": "10.0.0.1", "port": "8204"}]
            })
        );
    }

    #[test]
    fn descriptor_port_is_a_decimal_string() {
        let descriptor = registration().descriptor();
        let json = serde_json::to_value(&descriptor).unwrap();
        assert!(
            json["nodes"][0]["port"].is_string(),
            "port must serialize as a string, got {}",
            json["nodes"][0]["port"]
        );
    }

    #[test]
    fn removal_url_names_version_ip_and_port() {
        assert_eq!(
            registration().removal_url(),
            "http://10.1.1.1:80/openoapi/microservices/v1/services/tosca/version/v1/nodes/10.0.0.1/8204"
        );
    }

    #[test]
    fn registration_starts_unregistered() {
        assert!(!registration().is_registered());
    }
}
