//! Request option bundle and context construction
//!
//! Indirect requests carry a bundle of options instead of the document
//! itself. Only the keys below are recognized; unknown keys are ignored.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use super::context::ParseContext;
use super::extensions::{self, Extension};
use super::source::Location;
use super::PipelineError;

/// Recognized request options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestOptions {
    /// Fully-qualified name of a loader source extension
    pub loader_source: Option<String>,
    /// Fully-qualified name of a reader source extension
    pub reader_source: Option<String>,
    /// Fully-qualified name of a presenter source extension
    pub presenter_source: Option<String>,
    /// Fully-qualified name of a presenter extension; forces presenter
    /// selection instead of deriving it from the version declaration
    pub presenter: Option<String>,
    /// Opaque output override, stored verbatim on the context
    pub out: Option<Value>,
    /// Log full detail for parser-internal failures
    pub debug: Option<bool>,
    /// Document URI; exactly one of `uri` and `literal_location`
    pub uri: Option<String>,
    /// Inline document text; exactly one of `uri` and `literal_location`
    pub literal_location: Option<String>,
    /// Search path or list of paths; `<path>/definitions` is appended
    /// for each entry
    #[serde(default, deserialize_with = "path_or_paths")]
    pub prefixes: Option<Vec<String>>,
    /// Input values: a mapping installed directly, or a YAML string
    /// passed through as a context argument
    pub inputs: Option<Value>,
}

impl RequestOptions {
    /// Build a fresh parse context from this option bundle.
    pub fn build_context(&self) -> Result<ParseContext, PipelineError> {
        let mut context = ParseContext::new();

        match (&self.uri, &self.literal_location) {
            (Some(uri), None) => context.location = Some(Location::Uri(uri.clone())),
            (None, Some(text)) => context.location = Some(Location::Literal(text.clone())),
            _ => {
                return Err(PipelineError::BadRequest(
                    "exactly one of 'uri' or 'literal_location' must be provided".to_string(),
                ))
            }
        }

        if let Some(name) = &self.loader_source {
            context.loading.loader_source = match extensions::lookup(name) {
                Some(Extension::LoaderSource(kind)) => kind,
                _ => return Err(unknown_extension("loader_source", name)),
            };
        }
        if let Some(name) = &self.reader_source {
            context.loading.reader_source = match extensions::lookup(name) {
                Some(Extension::ReaderSource(kind)) => kind,
                _ => return Err(unknown_extension("reader_source", name)),
            };
        }
        if let Some(name) = &self.presenter_source {
            context.presentation.presenter_source = match extensions::lookup(name) {
                Some(Extension::PresenterSource(kind)) => kind,
                _ => return Err(unknown_extension("presenter_source", name)),
            };
        }
        if let Some(name) = &self.presenter {
            context.presentation.presenter = match extensions::lookup(name) {
                Some(Extension::Presenter(kind)) => Some(kind),
                _ => return Err(unknown_extension("presenter", name)),
            };
        }

        if let Some(out) = &self.out {
            context.out = Some(out.clone());
        }
        if let Some(debug) = self.debug {
            context.presentation.print_exceptions = debug;
        }
        if let Some(prefixes) = &self.prefixes {
            for prefix in prefixes {
                context
                    .loading
                    .prefixes
                    .push(PathBuf::from(prefix).join("definitions"));
            }
        }

        match &self.inputs {
            None => {}
            Some(Value::Object(map)) => {
                for (name, value) in map {
                    context.modeling.set_input(name.clone(), value.clone());
                }
            }
            Some(Value::String(text)) => context.arguments.push(format!("--inputs={text}")),
            Some(_) => {
                return Err(PipelineError::BadRequest(
                    "inputs must be a mapping or a string".to_string(),
                ))
            }
        }

        Ok(context)
    }
}

fn unknown_extension(option: &str, name: &str) -> PipelineError {
    PipelineError::Internal(anyhow::anyhow!("unknown {option} extension '{name}'"))
}

/// Deserialize a bare path string or a list of paths into a list.
fn path_or_paths<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PathOrPaths {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<PathOrPaths>::deserialize(deserializer)? {
        None => None,
        Some(PathOrPaths::One(path)) => Some(vec![path]),
        Some(PathOrPaths::Many(paths)) => Some(paths),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extensions::{PresenterKind, ReaderSourceKind};

    fn with_uri() -> RequestOptions {
        RequestOptions {
            uri: Some("service.yaml".to_string()),
            ..RequestOptions::default()
        }
    }

    #[test]
    fn exactly_one_source_must_be_named() {
        let neither = RequestOptions::default();
        assert!(matches!(
            neither.build_context(),
            Err(PipelineError::BadRequest(_))
        ));

        let both = RequestOptions {
            uri: Some("a.yaml".to_string()),
            literal_location: Some("x: y".to_string()),
            ..RequestOptions::default()
        };
        assert!(matches!(
            both.build_context(),
            Err(PipelineError::BadRequest(_))
        ));
    }

    #[test]
    fn source_options_become_locations() {
        let context = with_uri().build_context().unwrap();
        assert_eq!(
            context.location,
            Some(Location::Uri("service.yaml".to_string()))
        );

        let literal = RequestOptions {
            literal_location: Some("x: y".to_string()),
            ..RequestOptions::default()
        };
        let context = literal.build_context().unwrap();
        assert_eq!(context.location, Some(Location::Literal("x: y".to_string())));
    }

    #[test]
    fn extension_options_are_resolved_by_name() {
        let options = RequestOptions {
            reader_source: Some("aria.reading.YamlReaderSource".to_string()),
            presenter: Some("aria.presentation.CloudifyPresenter".to_string()),
            ..with_uri()
        };
        let context = options.build_context().unwrap();
        assert_eq!(context.loading.reader_source, ReaderSourceKind::Yaml);
        assert_eq!(
            context.presentation.presenter,
            Some(PresenterKind::Cloudify)
        );
    }

    #[test]
    fn unknown_extension_name_is_an_internal_error() {
        let options = RequestOptions {
            presenter: Some("aria.presentation.HeatPresenter".to_string()),
            ..with_uri()
        };
        assert!(matches!(
            options.build_context(),
            Err(PipelineError::Internal(_))
        ));
    }

    #[test]
    fn extension_of_wrong_kind_is_rejected() {
        // A reader source is not a presenter
        let options = RequestOptions {
            presenter: Some("aria.reading.YamlReaderSource".to_string()),
            ..with_uri()
        };
        assert!(matches!(
            options.build_context(),
            Err(PipelineError::Internal(_))
        ));
    }

    #[test]
    fn prefixes_gain_a_definitions_component() {
        let options = RequestOptions {
            prefixes: Some(vec!["/opt/tosca".to_string()]),
            ..with_uri()
        };
        let context = options.build_context().unwrap();
        assert_eq!(
            context.loading.prefixes,
            vec![PathBuf::from("/opt/tosca/definitions")]
        );
    }

    #[test]
    fn prefixes_deserialize_from_a_string_or_a_list() {
        let single: RequestOptions = serde_json::from_value(serde_json::json!({
            "uri": "service.yaml",
            "prefixes": "/opt/tosca"
        }))
        .unwrap();
        assert_eq!(single.prefixes, Some(vec!["/opt/tosca".to_string()]));

        let context = single.build_context().unwrap();
        assert_eq!(
            context.loading.prefixes,
            vec![PathBuf::from("/opt/tosca/definitions")]
        );

        let many: RequestOptions = serde_json::from_value(serde_json::json!({
            "uri": "service.yaml",
            "prefixes": ["/opt/a", "/opt/b"]
        }))
        .unwrap();
        assert_eq!(
            many.prefixes,
            Some(vec!["/opt/a".to_string(), "/opt/b".to_string()])
        );
    }

    #[test]
    fn inputs_mapping_installs_each_value() {
        let options = RequestOptions {
            inputs: Some(serde_json::json!({"port": 9090})),
            ..with_uri()
        };
        let context = options.build_context().unwrap();
        assert_eq!(context.modeling.inputs()["port"], serde_json::json!(9090));
    }

    #[test]
    fn inputs_string_becomes_a_context_argument() {
        let options = RequestOptions {
            inputs: Some(serde_json::json!("port: 9090")),
            ..with_uri()
        };
        let context = options.build_context().unwrap();
        assert_eq!(context.arguments, vec!["--inputs=port: 9090".to_string()]);
    }

    #[test]
    fn inputs_of_any_other_shape_are_rejected() {
        let options = RequestOptions {
            inputs: Some(serde_json::json!([1, 2, 3])),
            ..with_uri()
        };
        assert!(matches!(
            options.build_context(),
            Err(PipelineError::BadRequest(_))
        ));
    }

    #[test]
    fn debug_flag_enables_exception_detail() {
        let options = RequestOptions {
            debug: Some(true),
            ..with_uri()
        };
        let context = options.build_context().unwrap();
        assert!(context.presentation.print_exceptions);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let options: RequestOptions = serde_json::from_value(serde_json::json!({
            "uri": "service.yaml",
            "some_future_option": {"nested": true}
        }))
        .unwrap();
        assert_eq!(options.uri.as_deref(), Some("service.yaml"));
    }
}
