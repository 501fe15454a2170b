//! TOSCA parse pipeline
//!
//! Adapts service requests onto the parser's consumer chain. A request
//! names a stage (validate, model, instance) and a source (URI, literal
//! text, or an option bundle); the adapter builds a fresh context, runs
//! the chain, and returns either the stage's projection or the
//! validation issues found along the way.

pub mod consumers;
pub mod context;
pub mod extensions;
pub mod issues;
pub mod options;
pub mod source;

pub use context::ParseContext;
pub use issues::{IssueLevel, IssueRecord};
pub use options::RequestOptions;
pub use source::Location;

use std::time::Duration;

use anyhow::{Context as _, Result};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use consumers::{Consumer, Inputs, Instance, Model, Read, Validate};

/// How far the pipeline advances for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// read, validate
    Validate,
    /// read, validate, model
    Model,
    /// read, validate, model, inputs, instance
    Instance,
}

impl Stage {
    /// Consumers applied for this stage, in execution order.
    fn chain(&self, client: reqwest::Client) -> Vec<Box<dyn Consumer>> {
        let mut chain: Vec<Box<dyn Consumer>> =
            vec![Box::new(Read::new(client)), Box::new(Validate)];
        if matches!(self, Stage::Model | Stage::Instance) {
            chain.push(Box::new(Model));
        }
        if matches!(self, Stage::Instance) {
            chain.push(Box::new(Inputs));
            chain.push(Box::new(Instance));
        }
        chain
    }

    /// Success projection for this stage.
    ///
    /// Projections are strictly cumulative: `instance` implies `model`
    /// implies `types`.
    fn projection(&self, context: &ParseContext) -> Result<Value> {
        match self {
            Stage::Validate => Ok(json!({})),
            Stage::Model => Ok(json!({
                "types": projected(&context.types, "types")?,
                "model": projected(&context.model, "model")?,
            })),
            Stage::Instance => Ok(json!({
                "types": projected(&context.types, "types")?,
                "model": projected(&context.model, "model")?,
                "instance": projected(&context.instance, "instance")?,
            })),
        }
    }
}

fn projected(slot: &Option<Value>, name: &str) -> Result<Value> {
    slot.clone()
        .with_context(|| format!("pipeline completed without producing '{name}'"))
}

/// One parse invocation
#[derive(Debug)]
pub enum ParseRequest {
    /// Fetch the document from a URI
    Uri {
        uri: String,
        inputs: Option<String>,
    },
    /// Document text inlined in the request body
    Literal {
        content: String,
        inputs: Option<String>,
    },
    /// Option bundle, plus opaque arguments forced by the operation
    Indirect {
        options: RequestOptions,
        arguments: Vec<String>,
    },
}

/// Result of a pipeline run
#[derive(Debug)]
pub enum ParseOutcome {
    /// All requested stages completed; carries the stage projection
    Complete(Value),
    /// Validation reported issues; no projection is produced
    Invalid(Vec<IssueRecord>),
}

/// Failure modes the transport layer distinguishes
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request itself is malformed
    #[error("{0}")]
    BadRequest(String),
    /// Unexpected internal failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Executes parse requests against the consumer chain.
///
/// One adapter is shared by every request; each run builds a fresh
/// context, so no request observes another's partial state.
pub struct PipelineAdapter {
    client: reqwest::Client,
}

impl PipelineAdapter {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("aria-rest/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client for document loading")?;
        Ok(Self { client })
    }

    /// Run the request through the stage's consumer chain.
    pub async fn execute(
        &self,
        stage: Stage,
        request: ParseRequest,
    ) -> Result<ParseOutcome, PipelineError> {
        let mut context = build_context(request)?;

        for consumer in stage.chain(self.client.clone()) {
            debug!("Running consumer '{}'", consumer.name());
            if let Err(e) = consumer.consume(&mut context).await {
                if context.presentation.print_exceptions {
                    if let PipelineError::Internal(ref inner) = e {
                        error!("Consumer '{}' failed: {:#}", consumer.name(), inner);
                    }
                }
                return Err(e);
            }
            if context.has_issues() {
                debug!("Consumer '{}' reported issues, stopping", consumer.name());
                return Ok(ParseOutcome::Invalid(context.take_issues()));
            }
        }

        let projection = stage.projection(&context)?;
        Ok(ParseOutcome::Complete(projection))
    }
}

fn build_context(request: ParseRequest) -> Result<ParseContext, PipelineError> {
    match request {
        ParseRequest::Uri { uri, inputs } => {
            let mut context = ParseContext::new();
            context.location = Some(Location::Uri(uri));
            if let Some(inputs) = inputs {
                context.arguments.push(format!("--inputs={inputs}"));
            }
            Ok(context)
        }
        ParseRequest::Literal { content, inputs } => {
            let mut context = ParseContext::new();
            context.location = Some(Location::Literal(content));
            if let Some(inputs) = inputs {
                context.arguments.push(format!("--inputs={inputs}"));
            }
            Ok(context)
        }
        ParseRequest::Indirect { options, arguments } => {
            let mut context = options.build_context()?;
            context.arguments.extend(arguments);
            Ok(context)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_DOC: &str = r#"
tosca_definitions_version: tosca_simple_yaml_1_0
topology_template:
  inputs:
    host:
      type: string
  node_templates:
    web:
      type: WebServer
      properties:
        host: { get_input: host }
"#;

    fn adapter() -> PipelineAdapter {
        PipelineAdapter::new().unwrap()
    }

    fn literal(content: &str, inputs: Option<&str>) -> ParseRequest {
        ParseRequest::Literal {
            content: content.to_string(),
            inputs: inputs.map(str::to_string),
        }
    }

    #[test]
    fn stage_chains_follow_declared_order() {
        let names = |stage: Stage| -> Vec<&'static str> {
            stage
                .chain(reqwest::Client::new())
                .iter()
                .map(|consumer| consumer.name())
                .collect()
        };
        assert_eq!(names(Stage::Validate), ["read", "validate"]);
        assert_eq!(names(Stage::Model), ["read", "validate", "model"]);
        assert_eq!(
            names(Stage::Instance),
            ["read", "validate", "model", "inputs", "instance"]
        );
    }

    #[tokio::test]
    async fn validate_stage_projects_an_empty_object() {
        let outcome = adapter()
            .execute(Stage::Validate, literal(VALID_DOC, None))
            .await
            .unwrap();
        match outcome {
            ParseOutcome::Complete(projection) => assert_eq!(projection, json!({})),
            ParseOutcome::Invalid(issues) => panic!("unexpected issues: {issues:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_document_yields_issues_not_errors() {
        let outcome = adapter()
            .execute(Stage::Validate, literal("a: [broken\n", None))
            .await
            .unwrap();
        match outcome {
            ParseOutcome::Invalid(issues) => assert!(!issues.is_empty()),
            ParseOutcome::Complete(projection) => {
                panic!("expected issues, got projection {projection}")
            }
        }
    }

    #[tokio::test]
    async fn model_stage_projection_is_cumulative() {
        let outcome = adapter()
            .execute(Stage::Model, literal(VALID_DOC, None))
            .await
            .unwrap();
        let ParseOutcome::Complete(projection) = outcome else {
            panic!("expected a projection");
        };
        assert!(projection.get("types").is_some());
        assert!(projection.get("model").is_some());
        assert!(projection.get("instance").is_none());
    }

    #[tokio::test]
    async fn instance_stage_projection_has_all_keys() {
        let outcome = adapter()
            .execute(Stage::Instance, literal(VALID_DOC, Some("host: h1")))
            .await
            .unwrap();
        let ParseOutcome::Complete(projection) = outcome else {
            panic!("expected a projection");
        };
        assert!(projection.get("types").is_some());
        assert!(projection.get("model").is_some());
        assert!(projection.get("instance").is_some());
        assert_eq!(
            projection["instance"]["nodes"][0]["properties"]["host"],
            "h1"
        );
    }

    #[tokio::test]
    async fn indirect_request_builds_context_from_options() {
        let options = RequestOptions {
            literal_location: Some(VALID_DOC.to_string()),
            inputs: Some(json!({"host": "h2"})),
            ..RequestOptions::default()
        };
        let outcome = adapter()
            .execute(
                Stage::Instance,
                ParseRequest::Indirect {
                    options,
                    arguments: vec!["--json".to_string()],
                },
            )
            .await
            .unwrap();
        let ParseOutcome::Complete(projection) = outcome else {
            panic!("expected a projection");
        };
        assert_eq!(
            projection["instance"]["nodes"][0]["properties"]["host"],
            "h2"
        );
    }

    #[tokio::test]
    async fn indirect_request_without_source_is_rejected() {
        let err = adapter()
            .execute(
                Stage::Validate,
                ParseRequest::Indirect {
                    options: RequestOptions::default(),
                    arguments: Vec::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::BadRequest(_)));
    }
}
