//! MSB registration tests against a stub registry
//!
//! The stub records every request it sees so the tests can assert the
//! exact wire format the Open-O registry expects.

use std::sync::{Arc, Mutex};

use aria_rest::config::{MsbConfig, ServiceConfig};
use aria_rest::msb::{RegistryError, ServiceRegistration};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::{json, Value};

/// One request observed by the stub registry.
#[derive(Debug, Clone)]
struct Observed {
    method: String,
    path: String,
    body: Option<Value>,
}

#[derive(Clone)]
struct StubState {
    observed: Arc<Mutex<Vec<Observed>>>,
    register_status: StatusCode,
    remove_status: StatusCode,
}

async fn record(State(state): State<StubState>, request: Request) -> StatusCode {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    let body = serde_json::from_slice::<Value>(&bytes).ok();

    let status = if method == Method::POST {
        state.register_status
    } else {
        state.remove_status
    };
    state.observed.lock().unwrap().push(Observed {
        method: method.to_string(),
        path,
        body,
    });
    status
}

/// Start a stub registry answering with the given statuses.
async fn spawn_stub(
    register_status: StatusCode,
    remove_status: StatusCode,
) -> (String, u16, Arc<Mutex<Vec<Observed>>>) {
    let observed = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        observed: observed.clone(),
        register_status,
        remove_status,
    };
    let app = Router::new().fallback(record).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr.ip().to_string(), addr.port(), observed)
}

fn registration_for(host: &str, port: u16) -> ServiceRegistration {
    let msb = MsbConfig {
        host: host.to_string(),
        port,
        register_path: "/openoapi/microservices/v1/services".to_string(),
    };
    let service = ServiceConfig {
        name: "tosca".to_string(),
        version: "v1".to_string(),
        base_path: "/openoapi/tosca/v1/".to_string(),
        bind_ip: "10.0.0.1".to_string(),
        port: 8204,
        cors_enabled: false,
    };
    ServiceRegistration::new(&msb, &service).unwrap()
}

/// Reserve a port with nothing listening on it.
async fn closed_port() -> (String, u16) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    (addr.ip().to_string(), addr.port())
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn register_posts_the_exact_descriptor() {
    let (host, port, observed) = spawn_stub(StatusCode::CREATED, StatusCode::NO_CONTENT).await;
    let mut registration = registration_for(&host, port);

    registration.register().await.unwrap();
    assert!(registration.is_registered());

    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].method, "POST");
    assert_eq!(observed[0].path, "/openoapi/microservices/v1/services");
    assert_eq!(
        observed[0].body.as_ref().expect("JSON body"),
        &json!({
            "serviceName": "tosca",
            "version": "v1",
            "url": "/openoapi/tosca/v1",
            "protocol": "REST",
            "visualRange": "1",
            "nodes": [{"ip": "10.0.0.1", "port": "8204"}]
        })
    );
}

#[tokio::test]
async fn register_rejects_anything_but_created() {
    // Even a 200 is a rejection; the registry answers 201 on success.
    let (host, port, _observed) = spawn_stub(StatusCode::OK, StatusCode::NO_CONTENT).await;
    let mut registration = registration_for(&host, port);

    let err = registration.register().await.unwrap_err();
    assert!(
        matches!(err, RegistryError::Rejected { status } if status == StatusCode::OK),
        "unexpected error: {err}"
    );
    assert!(!registration.is_registered());
}

#[tokio::test]
async fn register_fails_when_the_registry_is_unreachable() {
    let (host, port) = closed_port().await;
    let mut registration = registration_for(&host, port);

    let err = registration.register().await.unwrap_err();
    assert!(
        matches!(err, RegistryError::Transport(_)),
        "unexpected error: {err}"
    );
    assert!(!registration.is_registered());
}

// ============================================================================
// Removal
// ============================================================================

#[tokio::test]
async fn unregister_deletes_the_node_entry() {
    let (host, port, observed) = spawn_stub(StatusCode::CREATED, StatusCode::NO_CONTENT).await;
    let mut registration = registration_for(&host, port);

    registration.register().await.unwrap();
    registration.unregister().await;
    assert!(!registration.is_registered());

    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), 2);
    assert_eq!(observed[1].method, "DELETE");
    assert_eq!(
        observed[1].path,
        "/openoapi/microservices/v1/services/tosca/version/v1/nodes/10.0.0.1/8204"
    );
}

#[tokio::test]
async fn unregister_failure_is_not_fatal() {
    let (host, port, observed) = spawn_stub(StatusCode::CREATED, StatusCode::INTERNAL_SERVER_ERROR).await;
    let mut registration = registration_for(&host, port);

    registration.register().await.unwrap();
    registration.unregister().await;

    // The removal was attempted; the failure is only logged.
    assert_eq!(observed.lock().unwrap().len(), 2);
    assert!(!registration.is_registered());
}

#[tokio::test]
async fn unregister_of_an_unreachable_registry_is_not_fatal() {
    let (host, port) = closed_port().await;
    let mut registration = registration_for(&host, port);

    registration.unregister().await;
    assert!(!registration.is_registered());
}
