//! Parser extension registry
//!
//! Extensions are addressed by fully-qualified name in request options
//! (`loader_source`, `reader_source`, `presenter_source`, `presenter`).
//! The registry is populated once at startup and never mutated afterward;
//! requests only look names up.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::{Map, Value};
use tracing::debug;

use super::issues::IssueRecord;

static REGISTRY: OnceLock<HashMap<&'static str, Extension>> = OnceLock::new();

/// Strategy for turning a location into loadable content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderSourceKind {
    Default,
}

/// Strategy for picking the concrete document reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderSourceKind {
    /// Sniff the document and pick YAML or JSON
    Default,
    /// Force the YAML reader
    Yaml,
    /// Force the JSON reader
    Json,
}

/// Concrete document syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl ReaderSourceKind {
    /// Pick the document format, sniffing the text when not forced.
    pub fn format_for(&self, text: &str) -> DocumentFormat {
        match self {
            Self::Yaml => DocumentFormat::Yaml,
            Self::Json => DocumentFormat::Json,
            Self::Default => {
                let trimmed = text.trim_start();
                if trimmed.starts_with('{') || trimmed.starts_with('[') {
                    DocumentFormat::Json
                } else {
                    DocumentFormat::Yaml
                }
            }
        }
    }
}

/// Strategy for selecting a presenter from the DSL version declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterSourceKind {
    Default,
}

impl PresenterSourceKind {
    /// Select a presenter for a `tosca_definitions_version` value.
    pub fn select(&self, version: &str) -> Option<PresenterKind> {
        match self {
            Self::Default => {
                if version.starts_with("tosca_simple_yaml")
                    || version.starts_with("tosca_simple_profile")
                {
                    Some(PresenterKind::ToscaSimple)
                } else if version.starts_with("cloudify_dsl") {
                    Some(PresenterKind::Cloudify)
                } else {
                    None
                }
            }
        }
    }
}

/// Structured view over a parsed DSL document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterKind {
    /// TOSCA Simple Profile: topology lives under `topology_template`
    ToscaSimple,
    /// Cloudify DSL: topology sections live at the document root
    Cloudify,
}

impl PresenterKind {
    /// Dotted document path for a location inside the topology section.
    pub fn topology_locator(&self, suffix: &str) -> String {
        match self {
            Self::ToscaSimple => format!("topology_template.{suffix}"),
            Self::Cloudify => suffix.to_string(),
        }
    }

    /// Locate the mapping that holds the topology sections
    /// (`inputs`, `node_templates`, `outputs`, ...).
    ///
    /// Returns `Ok(None)` when the document legitimately has no topology.
    pub fn topology_section<'a>(
        &self,
        root: &'a Map<String, Value>,
    ) -> Result<Option<&'a Map<String, Value>>, IssueRecord> {
        match self {
            Self::Cloudify => Ok(Some(root)),
            Self::ToscaSimple => match root.get("topology_template") {
                None => Ok(None),
                Some(Value::Object(section)) => Ok(Some(section)),
                Some(_) => Err(IssueRecord::error("'topology_template' must be a mapping")
                    .at("topology_template")),
            },
        }
    }
}

/// One installable parser extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    LoaderSource(LoaderSourceKind),
    ReaderSource(ReaderSourceKind),
    PresenterSource(PresenterSourceKind),
    Presenter(PresenterKind),
}

fn registry() -> &'static HashMap<&'static str, Extension> {
    REGISTRY.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert(
            "aria.loading.DefaultLoaderSource",
            Extension::LoaderSource(LoaderSourceKind::Default),
        );
        map.insert(
            "aria.reading.DefaultReaderSource",
            Extension::ReaderSource(ReaderSourceKind::Default),
        );
        map.insert(
            "aria.reading.YamlReaderSource",
            Extension::ReaderSource(ReaderSourceKind::Yaml),
        );
        map.insert(
            "aria.reading.JsonReaderSource",
            Extension::ReaderSource(ReaderSourceKind::Json),
        );
        map.insert(
            "aria.presentation.DefaultPresenterSource",
            Extension::PresenterSource(PresenterSourceKind::Default),
        );
        map.insert(
            "aria.presentation.ToscaSimplePresenter",
            Extension::Presenter(PresenterKind::ToscaSimple),
        );
        map.insert(
            "aria.presentation.CloudifyPresenter",
            Extension::Presenter(PresenterKind::Cloudify),
        );
        map
    })
}

/// Populate the extension registry. Idempotent.
pub fn install() {
    let installed = registry();
    debug!("Installed {} parser extensions", installed.len());
}

/// Look up an extension by its fully-qualified name.
pub fn lookup(name: &str) -> Option<Extension> {
    registry().get(name).copied()
}
