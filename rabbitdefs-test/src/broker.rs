//! Fake RabbitMQ management API
//!
//! Serves `GET` and `POST` on `/api/definitions` behind basic auth. Imported
//! documents are stored and returned by the next export, the way a real
//! broker echoes back what it now holds.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use base64::Engine;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::server::{FakeServer, TestError};

#[derive(Default)]
struct BrokerState {
    expected_auth: String,
    definitions: Option<Value>,
    import_count: usize,
    export_count: usize,
    forced_status: Option<StatusCode>,
}

/// A running fake broker
pub struct FakeBroker {
    state: Arc<Mutex<BrokerState>>,
    server: FakeServer,
}

impl FakeBroker {
    /// Start a broker accepting only `username`/`password`
    pub async fn start(username: &str, password: &str) -> Result<Self, TestError> {
        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{username}:{password}"));
        let state = Arc::new(Mutex::new(BrokerState {
            expected_auth: format!("Basic {token}"),
            ..BrokerState::default()
        }));

        let router = Router::new()
            .route(
                "/api/definitions",
                get(export_definitions).post(import_definitions),
            )
            .with_state(state.clone());

        let server = FakeServer::spawn("rabbitmq", router).await?;
        Ok(Self { state, server })
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Answer every request with `status` from now on
    pub fn fail_with(&self, status: StatusCode) {
        self.state.lock().forced_status = Some(status);
    }

    /// Last successfully imported document
    pub fn definitions(&self) -> Option<Value> {
        self.state.lock().definitions.clone()
    }

    pub fn import_count(&self) -> usize {
        self.state.lock().import_count
    }

    pub fn export_count(&self) -> usize {
        self.state.lock().export_count
    }
}

fn check(state: &BrokerState, headers: &HeaderMap) -> Result<(), Response> {
    if let Some(status) = state.forced_status {
        return Err(error_response(status, "forced failure"));
    }

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == state.expected_auth);
    if !authorized {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Login failed",
        ));
    }

    Ok(())
}

async fn import_definitions(
    State(state): State<Arc<Mutex<BrokerState>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut state = state.lock();
    if let Err(response) = check(&state, &headers) {
        return response;
    }

    match serde_json::from_slice::<Value>(&body) {
        Ok(value) if value.is_object() => {
            info!(bytes = body.len(), "Fake broker imported definitions");
            state.definitions = Some(value);
            state.import_count += 1;
            Response::builder()
                .status(StatusCode::NO_CONTENT)
                .body(Body::empty())
                .unwrap()
        }
        _ => error_response(StatusCode::BAD_REQUEST, "Definitions must be a JSON object"),
    }
}

async fn export_definitions(
    State(state): State<Arc<Mutex<BrokerState>>>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock();
    if let Err(response) = check(&state, &headers) {
        return response;
    }

    state.export_count += 1;
    let body = state
        .definitions
        .clone()
        .unwrap_or_else(|| serde_json::json!({ "rabbit_version": "3.13.7" }));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn error_response(status: StatusCode, reason: &str) -> Response {
    let body = serde_json::json!({
        "error": status.canonical_reason().unwrap_or("error"),
        "reason": reason
    });
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
