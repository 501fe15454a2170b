//! HTTP API Server Module
//!
//! REST surface for the parse service: nine operations (three stages,
//! each reachable by URI, upload, or option bundle) plus a health check,
//! mounted under the configured base path.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use routes::{check_operations, create_router, DispatchError, OPERATIONS};
pub use server::HttpServer;
