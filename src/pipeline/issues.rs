//! Structured diagnostics produced by the parse pipeline
//!
//! Issues are forwarded to the caller verbatim; the service does not
//! interpret them beyond checking for their presence.

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    Warning,
    Error,
}

/// A single diagnostic attached to a parse context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Severity
    pub level: IssueLevel,
    /// Human-readable description
    pub message: String,
    /// Where in the document the issue was found, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

impl IssueRecord {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            message: message.into(),
            locator: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warning,
            message: message.into(),
            locator: None,
        }
    }

    /// Attach a locator describing where the issue was found.
    pub fn at(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_serializes_level_lowercase() {
        let issue = IssueRecord::error("bad document");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["level"], "error");
        assert_eq!(json["message"], "bad document");
    }

    #[test]
    fn locator_is_omitted_when_absent() {
        let issue = IssueRecord::warning("unused definition");
        let json = serde_json::to_value(&issue).unwrap();
        assert!(json.get("locator").is_none());

        let located = IssueRecord::error("missing type").at("node_templates.web");
        let json = serde_json::to_value(&located).unwrap();
        assert_eq!(json["locator"], "node_templates.web");
    }
}
