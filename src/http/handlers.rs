//! HTTP API Request Handlers
//!
//! Handlers that map HTTP operations onto the parse pipeline adapter.
//! Validation issues are a success at this layer: they come back as 200
//! with an issues envelope, never as an HTTP error.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::pipeline::{
    ParseOutcome, ParseRequest, PipelineAdapter, PipelineError, RequestOptions, Stage,
};

use super::types::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<PipelineAdapter>,
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Validate a document fetched from a URI
pub async fn validate_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> impl IntoResponse {
    let request = ParseRequest::Uri {
        uri: query.uri,
        inputs: None,
    };
    run_stage(&state, Stage::Validate, request).await
}

/// Validate document text uploaded in the request body
pub async fn validate_upload(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let request = ParseRequest::Literal {
        content: body,
        inputs: None,
    };
    run_stage(&state, Stage::Validate, request).await
}

/// Validate via an option bundle
pub async fn validate_indirect(
    State(state): State<AppState>,
    Json(options): Json<RequestOptions>,
) -> impl IntoResponse {
    let request = ParseRequest::Indirect {
        options,
        arguments: Vec::new(),
    };
    run_stage(&state, Stage::Validate, request).await
}

/// Model a document fetched from a URI
pub async fn model_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> impl IntoResponse {
    let request = ParseRequest::Uri {
        uri: query.uri,
        inputs: None,
    };
    run_stage(&state, Stage::Model, request).await
}

/// Model document text uploaded in the request body
pub async fn model_upload(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let request = ParseRequest::Literal {
        content: body,
        inputs: None,
    };
    run_stage(&state, Stage::Model, request).await
}

/// Model via an option bundle
pub async fn model_indirect(
    State(state): State<AppState>,
    Json(options): Json<RequestOptions>,
) -> impl IntoResponse {
    let request = ParseRequest::Indirect {
        options,
        arguments: Vec::new(),
    };
    run_stage(&state, Stage::Model, request).await
}

/// Instantiate a document fetched from a URI
pub async fn instance_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> impl IntoResponse {
    let request = ParseRequest::Uri {
        uri: query.uri,
        inputs: query.inputs,
    };
    run_stage(&state, Stage::Instance, request).await
}

/// Instantiate document text uploaded in the request body
pub async fn instance_upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: String,
) -> impl IntoResponse {
    let request = ParseRequest::Literal {
        content: body,
        inputs: query.inputs,
    };
    run_stage(&state, Stage::Instance, request).await
}

/// Instantiate via an option bundle
pub async fn instance_indirect(
    State(state): State<AppState>,
    Json(options): Json<RequestOptions>,
) -> impl IntoResponse {
    let request = ParseRequest::Indirect {
        options,
        // Instance runs always carry the JSON output argument
        arguments: vec!["--json".to_string()],
    };
    run_stage(&state, Stage::Instance, request).await
}

async fn run_stage(state: &AppState, stage: Stage, request: ParseRequest) -> Response {
    match state.adapter.execute(stage, request).await {
        Ok(ParseOutcome::Complete(projection)) => {
            (StatusCode::OK, Json(projection)).into_response()
        }
        Ok(ParseOutcome::Invalid(issues)) => {
            debug!("Returning {} validation issues", issues.len());
            (StatusCode::OK, Json(IssuesEnvelope { issues })).into_response()
        }
        Err(PipelineError::BadRequest(message)) => {
            debug!("Rejecting malformed request: {}", message);
            (StatusCode::BAD_REQUEST, message).into_response()
        }
        Err(PipelineError::Internal(error)) => {
            error!("Parse pipeline failed: {:#}", error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("parser error: {error}"),
            )
                .into_response()
        }
    }
}
