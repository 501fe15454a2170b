//! Per-request parse context
//!
//! A fresh context is built for every request and discarded afterward;
//! nothing is shared or cached across requests. Consumers read and
//! extend the context as the chain advances.

use std::path::PathBuf;

use serde_json::{Map, Value};

use super::extensions::{LoaderSourceKind, PresenterKind, PresenterSourceKind, ReaderSourceKind};
use super::issues::IssueRecord;
use super::source::Location;

/// Options governing how content is located and read
#[derive(Debug)]
pub struct LoadingSection {
    pub loader_source: LoaderSourceKind,
    pub reader_source: ReaderSourceKind,
    /// Directories searched when resolving relative document paths
    pub prefixes: Vec<PathBuf>,
}

/// Options governing presenter selection
#[derive(Debug)]
pub struct PresentationSection {
    pub presenter_source: PresenterSourceKind,
    /// Forced presenter; overrides version-based selection when set
    pub presenter: Option<PresenterKind>,
    /// Log full detail for parser-internal failures
    pub print_exceptions: bool,
}

/// Inputs supplied alongside the document
#[derive(Debug, Default)]
pub struct ModelingSection {
    inputs: Map<String, Value>,
}

impl ModelingSection {
    pub fn set_input(&mut self, name: impl Into<String>, value: Value) {
        self.inputs.insert(name.into(), value);
    }

    pub fn inputs(&self) -> &Map<String, Value> {
        &self.inputs
    }
}

/// State threaded through the consumer chain for one request
#[derive(Debug)]
pub struct ParseContext {
    pub loading: LoadingSection,
    pub presentation: PresentationSection,
    pub modeling: ModelingSection,
    /// Opaque output override, carried verbatim for parser-internal use
    pub out: Option<Value>,
    /// Opaque positional arguments (`--inputs=...`, `--json`)
    pub arguments: Vec<String>,
    /// Where the document comes from
    pub location: Option<Location>,
    /// Raw document text, set by the read stage
    pub text: Option<String>,
    /// Parsed document root, set by the validate stage
    pub document: Option<Value>,
    /// Presenter in effect for the document, set by the validate stage
    pub presenter: Option<PresenterKind>,
    /// Type definitions projection, set by the model stage
    pub types: Option<Value>,
    /// Topology model projection, set by the model stage
    pub model: Option<Value>,
    /// Merged input values, set by the inputs stage
    pub effective_inputs: Option<Map<String, Value>>,
    /// Instantiated topology, set by the instance stage
    pub instance: Option<Value>,
    issues: Vec<IssueRecord>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self {
            loading: LoadingSection {
                loader_source: LoaderSourceKind::Default,
                reader_source: ReaderSourceKind::Default,
                prefixes: Vec::new(),
            },
            presentation: PresentationSection {
                presenter_source: PresenterSourceKind::Default,
                presenter: None,
                print_exceptions: false,
            },
            modeling: ModelingSection::default(),
            out: None,
            arguments: Vec::new(),
            location: None,
            text: None,
            document: None,
            presenter: None,
            types: None,
            model: None,
            effective_inputs: None,
            instance: None,
            issues: Vec::new(),
        }
    }

    /// Record a diagnostic against this context.
    pub fn report(&mut self, issue: IssueRecord) {
        self.issues.push(issue);
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Take all recorded diagnostics, leaving the context clean.
    pub fn take_issues(&mut self) -> Vec<IssueRecord> {
        std::mem::take(&mut self.issues)
    }
}

impl Default for ParseContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_input_overwrites_previous_value() {
        let mut ctx = ParseContext::new();
        ctx.modeling.set_input("port", serde_json::json!(8080));
        ctx.modeling.set_input("port", serde_json::json!(9090));
        assert_eq!(ctx.modeling.inputs()["port"], serde_json::json!(9090));
    }

    #[test]
    fn take_issues_drains_in_report_order() {
        let mut ctx = ParseContext::new();
        assert!(!ctx.has_issues());

        ctx.report(IssueRecord::error("first"));
        ctx.report(IssueRecord::error("second"));
        assert!(ctx.has_issues());

        let issues = ctx.take_issues();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].message, "first");
        assert_eq!(issues[1].message, "second");
        assert!(!ctx.has_issues());
    }
}
