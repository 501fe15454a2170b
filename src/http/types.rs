//! HTTP API Request/Response Types
//!
//! JSON-serializable types for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::pipeline::IssueRecord;

/// Query parameters for URI-based operations
#[derive(Debug, Clone, Deserialize)]
pub struct FileQuery {
    /// Document URI to parse
    pub uri: String,
    /// Optional input values as a YAML/JSON mapping string
    #[serde(default)]
    pub inputs: Option<String>,
}

/// Query parameters for upload operations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadQuery {
    /// Optional input values as a YAML/JSON mapping string
    #[serde(default)]
    pub inputs: Option<String>,
}

/// Envelope returned when validation reports issues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuesEnvelope {
    /// Parser diagnostics, forwarded verbatim
    pub issues: Vec<IssueRecord>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Whether the service is healthy
    pub healthy: bool,
    /// Service version
    pub version: String,
}
