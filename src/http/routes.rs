//! HTTP API Route Definitions
//!
//! The operation table is the service's dispatch map: each entry binds
//! an operation id to a verb, a path, a pipeline stage, and an input
//! shape. Operation ids resolve to handlers once at startup; an id with
//! no handler fails the bind, never a request.

use axum::handler::Handler;
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use thiserror::Error;

use crate::pipeline::Stage;

use super::handlers::{self, AppState};

/// HTTP verb an operation is served under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMethod {
    Get,
    Post,
}

impl OperationMethod {
    fn bind<H, T>(self, handler: H) -> MethodRouter<AppState>
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        match self {
            Self::Get => get(handler),
            Self::Post => post(handler),
        }
    }
}

/// How an operation receives its document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// URI in query parameters
    Uri,
    /// Literal text in the request body
    Upload,
    /// Option bundle in the request body
    Indirect,
}

/// One published operation
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    pub operation_id: &'static str,
    pub method: OperationMethod,
    pub path: &'static str,
    pub stage: Stage,
    pub shape: InputShape,
}

/// Every operation the service publishes: three stages, each reachable
/// through three input shapes.
pub const OPERATIONS: [OperationSpec; 9] = [
    OperationSpec {
        operation_id: "validate_file",
        method: OperationMethod::Get,
        path: "/validate",
        stage: Stage::Validate,
        shape: InputShape::Uri,
    },
    OperationSpec {
        operation_id: "validate_upload",
        method: OperationMethod::Post,
        path: "/validate",
        stage: Stage::Validate,
        shape: InputShape::Upload,
    },
    OperationSpec {
        operation_id: "validate_indirect",
        method: OperationMethod::Post,
        path: "/validate/indirect",
        stage: Stage::Validate,
        shape: InputShape::Indirect,
    },
    OperationSpec {
        operation_id: "model_file",
        method: OperationMethod::Get,
        path: "/model",
        stage: Stage::Model,
        shape: InputShape::Uri,
    },
    OperationSpec {
        operation_id: "model_upload",
        method: OperationMethod::Post,
        path: "/model",
        stage: Stage::Model,
        shape: InputShape::Upload,
    },
    OperationSpec {
        operation_id: "model_indirect",
        method: OperationMethod::Post,
        path: "/model/indirect",
        stage: Stage::Model,
        shape: InputShape::Indirect,
    },
    OperationSpec {
        operation_id: "instance_file",
        method: OperationMethod::Get,
        path: "/instance",
        stage: Stage::Instance,
        shape: InputShape::Uri,
    },
    OperationSpec {
        operation_id: "instance_upload",
        method: OperationMethod::Post,
        path: "/instance",
        stage: Stage::Instance,
        shape: InputShape::Upload,
    },
    OperationSpec {
        operation_id: "instance_indirect",
        method: OperationMethod::Post,
        path: "/instance/indirect",
        stage: Stage::Instance,
        shape: InputShape::Indirect,
    },
];

/// Operation table errors, surfaced at startup
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Operation id with no registered handler
    #[error("no handler registered for operation '{0}'")]
    UnresolvedOperation(String),
}

fn method_router(op: &OperationSpec) -> Result<MethodRouter<AppState>, DispatchError> {
    let router = match op.operation_id {
        "validate_file" => op.method.bind(handlers::validate_file),
        "validate_upload" => op.method.bind(handlers::validate_upload),
        "validate_indirect" => op.method.bind(handlers::validate_indirect),
        "model_file" => op.method.bind(handlers::model_file),
        "model_upload" => op.method.bind(handlers::model_upload),
        "model_indirect" => op.method.bind(handlers::model_indirect),
        "instance_file" => op.method.bind(handlers::instance_file),
        "instance_upload" => op.method.bind(handlers::instance_upload),
        "instance_indirect" => op.method.bind(handlers::instance_indirect),
        _ => {
            return Err(DispatchError::UnresolvedOperation(
                op.operation_id.to_string(),
            ))
        }
    };
    Ok(router)
}

/// Resolve every operation id against its handler.
///
/// Run at startup so an unresolvable operation fails the service before
/// it detaches or binds its port.
pub fn check_operations() -> Result<(), DispatchError> {
    for op in &OPERATIONS {
        let _ = method_router(op)?;
    }
    Ok(())
}

/// Create the API router with all routes, mounted under the base path.
pub fn create_router(app_state: AppState, base_path: &str) -> Result<Router, DispatchError> {
    let mut api = Router::new().route("/health", get(handlers::health));
    for op in &OPERATIONS {
        // Same-path entries merge into one route with both verbs
        api = api.route(op.path, method_router(op)?);
    }
    let api = api.with_state(app_state);

    let base = base_path.trim_end_matches('/');
    if base.is_empty() {
        Ok(api)
    } else {
        Ok(Router::new().nest(base, api))
    }
}
