//! Parse stages applied to a context in order
//!
//! Each consumer advances the context one stage: read loads the raw
//! text, validate parses and checks it, model projects type and
//! topology views, inputs merges declared and provided values, and
//! instance instantiates the topology. A consumer records problems as
//! issues on the context; the chain stops advancing once any are
//! present.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::context::ParseContext;
use super::extensions::{DocumentFormat, PresenterKind};
use super::issues::IssueRecord;
use super::source::UriLoader;
use super::PipelineError;

/// Document sections contributing to the `types` projection
const TYPE_SECTIONS: [&str; 8] = [
    "artifact_types",
    "capability_types",
    "data_types",
    "group_types",
    "interface_types",
    "node_types",
    "policy_types",
    "relationship_types",
];

/// Topology sections contributing to the `model` projection
const TOPOLOGY_SECTIONS: [&str; 5] = ["inputs", "node_templates", "outputs", "groups", "policies"];

/// One stage of the parse pipeline
#[async_trait]
pub trait Consumer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn consume(&self, context: &mut ParseContext) -> Result<(), PipelineError>;
}

fn internal(message: &str) -> PipelineError {
    PipelineError::Internal(anyhow::anyhow!("{message}"))
}

// ============================================================================
// Read
// ============================================================================

/// Loads the raw document text from the context's location.
pub struct Read {
    loader: UriLoader,
}

impl Read {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            loader: UriLoader::new(client),
        }
    }
}

#[async_trait]
impl Consumer for Read {
    fn name(&self) -> &'static str {
        "read"
    }

    async fn consume(&self, context: &mut ParseContext) -> Result<(), PipelineError> {
        let Some(location) = context.location.clone() else {
            return Err(PipelineError::BadRequest(
                "no parse source was provided".to_string(),
            ));
        };

        match self.loader.load(&location, &context.loading.prefixes).await {
            Ok(text) => {
                debug!("Read {} bytes from {}", text.len(), location.describe());
                context.text = Some(text);
            }
            Err(issue) => context.report(issue),
        }
        Ok(())
    }
}

// ============================================================================
// Validate
// ============================================================================

/// Parses the document text and checks its structure.
///
/// Selects the presenter from the version declaration (unless one was
/// forced through the options) and verifies the sections the later
/// stages rely on: a mapping root, a topology section that is a mapping,
/// and node templates that each carry a `type`.
pub struct Validate;

#[async_trait]
impl Consumer for Validate {
    fn name(&self) -> &'static str {
        "validate"
    }

    async fn consume(&self, context: &mut ParseContext) -> Result<(), PipelineError> {
        let Some(text) = context.text.as_deref() else {
            return Err(internal("validate stage reached without document text"));
        };

        let parsed: Result<Value, String> = match context.loading.reader_source.format_for(text) {
            DocumentFormat::Yaml => {
                serde_saphyr::from_str::<Value>(text).map_err(|e| e.to_string())
            }
            DocumentFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        };
        let document = match parsed {
            Ok(document) => document,
            Err(e) => {
                context.report(IssueRecord::error(format!("syntax error: {e}")));
                return Ok(());
            }
        };

        let Some(root) = document.as_object() else {
            context.report(IssueRecord::error("document root must be a mapping"));
            return Ok(());
        };

        let version = match root.get("tosca_definitions_version") {
            Some(Value::String(version)) => version.clone(),
            Some(_) => {
                context.report(
                    IssueRecord::error("'tosca_definitions_version' must be a string")
                        .at("tosca_definitions_version"),
                );
                return Ok(());
            }
            None => {
                context.report(IssueRecord::error(
                    "missing required 'tosca_definitions_version'",
                ));
                return Ok(());
            }
        };

        let presenter = match context.presentation.presenter {
            Some(forced) => forced,
            None => match context.presentation.presenter_source.select(&version) {
                Some(selected) => selected,
                None => {
                    context.report(
                        IssueRecord::error(format!(
                            "unsupported tosca_definitions_version '{version}'"
                        ))
                        .at("tosca_definitions_version"),
                    );
                    return Ok(());
                }
            },
        };

        let issues = check_structure(root, presenter);
        for issue in issues {
            context.report(issue);
        }

        context.presenter = Some(presenter);
        context.document = Some(document);
        Ok(())
    }
}

/// Structure checks over the sections later stages consume.
fn check_structure(root: &Map<String, Value>, presenter: PresenterKind) -> Vec<IssueRecord> {
    let mut issues = Vec::new();

    let topology = match presenter.topology_section(root) {
        Ok(Some(topology)) => topology,
        Ok(None) => return issues,
        Err(issue) => {
            issues.push(issue);
            return issues;
        }
    };

    if let Some(inputs) = topology.get("inputs") {
        if !inputs.is_object() {
            issues.push(
                IssueRecord::error("'inputs' must be a mapping")
                    .at(presenter.topology_locator("inputs")),
            );
        }
    }

    let templates = match topology.get("node_templates") {
        None => return issues,
        Some(Value::Object(templates)) => templates,
        Some(_) => {
            issues.push(
                IssueRecord::error("'node_templates' must be a mapping")
                    .at(presenter.topology_locator("node_templates")),
            );
            return issues;
        }
    };

    for (name, template) in templates {
        let locator = presenter.topology_locator(&format!("node_templates.{name}"));
        let Some(template) = template.as_object() else {
            issues.push(
                IssueRecord::error(format!("node template '{name}' must be a mapping"))
                    .at(locator),
            );
            continue;
        };
        match template.get("type") {
            Some(Value::String(_)) => {}
            Some(_) => issues.push(
                IssueRecord::error(format!("node template '{name}' has a non-string 'type'"))
                    .at(locator),
            ),
            None => issues.push(
                IssueRecord::error(format!(
                    "node template '{name}' is missing required 'type'"
                ))
                .at(locator),
            ),
        }
        if let Some(properties) = template.get("properties") {
            if !properties.is_object() {
                issues.push(
                    IssueRecord::error(format!(
                        "properties of node template '{name}' must be a mapping"
                    ))
                    .at(presenter.topology_locator(&format!("node_templates.{name}.properties"))),
                );
            }
        }
    }

    issues
}

// ============================================================================
// Model
// ============================================================================

/// Projects the validated document into `types` and `model` views.
pub struct Model;

#[async_trait]
impl Consumer for Model {
    fn name(&self) -> &'static str {
        "model"
    }

    async fn consume(&self, context: &mut ParseContext) -> Result<(), PipelineError> {
        let Some(presenter) = context.presenter else {
            return Err(internal("model stage reached without a presenter"));
        };
        let Some(root) = context.document.as_ref().and_then(Value::as_object) else {
            return Err(internal("model stage reached without a parsed document"));
        };

        let mut types = Map::new();
        for section in TYPE_SECTIONS {
            if let Some(value) = root.get(section) {
                types.insert(section.to_string(), value.clone());
            }
        }

        let mut model = Map::new();
        if let Some(description) = root.get("description") {
            model.insert("description".to_string(), description.clone());
        }
        match presenter.topology_section(root) {
            Ok(Some(topology)) => {
                for section in TOPOLOGY_SECTIONS {
                    if let Some(value) = topology.get(section) {
                        model.insert(section.to_string(), value.clone());
                    }
                }
            }
            Ok(None) => {}
            Err(issue) => {
                context.report(issue);
                return Ok(());
            }
        }

        context.types = Some(Value::Object(types));
        context.model = Some(Value::Object(model));
        Ok(())
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// Merges provided input values with the declarations in the document.
///
/// Provided values come from two places: `--inputs=<yaml>` context
/// arguments, and values installed directly on the modeling section
/// (the latter win). Declared inputs without a provided value fall back
/// to their default; a declaration with no default and `required` not
/// set to `false` must be provided.
pub struct Inputs;

#[async_trait]
impl Consumer for Inputs {
    fn name(&self) -> &'static str {
        "inputs"
    }

    async fn consume(&self, context: &mut ParseContext) -> Result<(), PipelineError> {
        let mut issues = Vec::new();

        let mut provided = Map::new();
        for argument in &context.arguments {
            let Some(text) = argument.strip_prefix("--inputs=") else {
                continue;
            };
            match serde_saphyr::from_str::<Value>(text) {
                Ok(Value::Object(map)) => provided.extend(map),
                Ok(_) => issues.push(IssueRecord::error("inputs must be a mapping")),
                Err(e) => issues.push(IssueRecord::error(format!("syntax error in inputs: {e}"))),
            }
        }
        for (name, value) in context.modeling.inputs() {
            provided.insert(name.clone(), value.clone());
        }

        let Some(presenter) = context.presenter else {
            return Err(internal("inputs stage reached without a presenter"));
        };
        let Some(root) = context.document.as_ref().and_then(Value::as_object) else {
            return Err(internal("inputs stage reached without a parsed document"));
        };

        let declared: Map<String, Value> = match presenter.topology_section(root) {
            Ok(Some(topology)) => match topology.get("inputs") {
                Some(Value::Object(declared)) => declared.clone(),
                _ => Map::new(),
            },
            Ok(None) => Map::new(),
            Err(issue) => {
                context.report(issue);
                return Ok(());
            }
        };

        for name in provided.keys() {
            if !declared.contains_key(name) {
                issues.push(IssueRecord::error(format!("unknown input '{name}'")));
            }
        }

        let mut effective = Map::new();
        for (name, declaration) in &declared {
            let locator = presenter.topology_locator(&format!("inputs.{name}"));
            let Some(declaration) = declaration.as_object() else {
                issues.push(
                    IssueRecord::error(format!("input declaration '{name}' must be a mapping"))
                        .at(locator),
                );
                continue;
            };
            if let Some(value) = provided.get(name) {
                effective.insert(name.clone(), value.clone());
            } else if let Some(default) = declaration.get("default") {
                effective.insert(name.clone(), default.clone());
            } else if declaration.get("required").and_then(Value::as_bool) != Some(false) {
                issues.push(
                    IssueRecord::error(format!("required input '{name}' was not provided"))
                        .at(locator),
                );
            }
        }

        for issue in issues {
            context.report(issue);
        }
        context.effective_inputs = Some(effective);
        Ok(())
    }
}

// ============================================================================
// Instance
// ============================================================================

/// Instantiates the topology: one node per template, with intrinsic
/// functions evaluated against the effective inputs.
pub struct Instance;

#[async_trait]
impl Consumer for Instance {
    fn name(&self) -> &'static str {
        "instance"
    }

    async fn consume(&self, context: &mut ParseContext) -> Result<(), PipelineError> {
        let Some(effective) = context.effective_inputs.clone() else {
            return Err(internal("instance stage reached without effective inputs"));
        };
        let Some(presenter) = context.presenter else {
            return Err(internal("instance stage reached without a presenter"));
        };
        let Some(root) = context.document.as_ref().and_then(Value::as_object) else {
            return Err(internal("instance stage reached without a parsed document"));
        };

        let templates: Map<String, Value> = match presenter.topology_section(root) {
            Ok(Some(topology)) => match topology.get("node_templates") {
                Some(Value::Object(templates)) => templates.clone(),
                _ => Map::new(),
            },
            Ok(None) => Map::new(),
            Err(issue) => {
                context.report(issue);
                return Ok(());
            }
        };

        let mut issues = Vec::new();
        let mut nodes = Vec::new();
        for (name, template) in &templates {
            let resolved = resolve_functions(template, &effective, &mut issues);
            let mut node = Map::new();
            node.insert(
                "id".to_string(),
                Value::String(format!("{}_{}", name, Uuid::new_v4().simple())),
            );
            node.insert("name".to_string(), Value::String(name.clone()));
            if let Some(type_name) = resolved.get("type") {
                node.insert("type".to_string(), type_name.clone());
            }
            node.insert(
                "properties".to_string(),
                resolved
                    .get("properties")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new())),
            );
            nodes.push(Value::Object(node));
        }

        if issues.is_empty() {
            let mut instance = Map::new();
            instance.insert(
                "id".to_string(),
                Value::String(Uuid::new_v4().simple().to_string()),
            );
            instance.insert("nodes".to_string(), Value::Array(nodes));
            context.instance = Some(Value::Object(instance));
        } else {
            for issue in issues {
                context.report(issue);
            }
        }
        Ok(())
    }
}

/// Evaluate `{get_input: <name>}` occurrences against the effective inputs.
fn resolve_functions(
    value: &Value,
    inputs: &Map<String, Value>,
    issues: &mut Vec<IssueRecord>,
) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(name)) = map.get("get_input") {
                    return match inputs.get(name) {
                        Some(resolved) => resolved.clone(),
                        None => {
                            issues.push(IssueRecord::error(format!(
                                "get_input: unknown input '{name}'"
                            )));
                            Value::Null
                        }
                    };
                }
            }
            Value::Object(
                map.iter()
                    .map(|(key, nested)| (key.clone(), resolve_functions(nested, inputs, issues)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_functions(item, inputs, issues))
                .collect(),
        ),
        other => other.clone(),
    }
}
