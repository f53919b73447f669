//! Fake Secrets Manager endpoint
//!
//! Answers the JSON protocol the AWS SDK speaks, dispatching on the
//! `X-Amz-Target` header. Only `GetSecretValue` is implemented.

use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::config::{Credentials, Region};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::post,
    Router,
};
use base64::Engine;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::server::{FakeServer, TestError};

#[derive(Debug, Clone)]
enum StoredSecret {
    String(String),
    Binary(Vec<u8>),
}

#[derive(Default)]
struct SecretsState {
    secrets: HashMap<String, (String, StoredSecret)>,
    requests: usize,
}

/// A running fake Secrets Manager
pub struct FakeSecretsManager {
    state: Arc<Mutex<SecretsState>>,
    server: FakeServer,
}

impl FakeSecretsManager {
    pub async fn start() -> Result<Self, TestError> {
        let state = Arc::new(Mutex::new(SecretsState::default()));

        let router = Router::new()
            .route("/", post(handle_request))
            .with_state(state.clone());
        let server = FakeServer::spawn("secretsmanager", router).await?;

        Ok(Self { state, server })
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Store a string secret under `name`; returns its ARN
    pub fn put_string(&self, name: &str, value: &str) -> String {
        self.put(name, StoredSecret::String(value.to_string()))
    }

    /// Store a binary-only secret under `name`; returns its ARN
    pub fn put_binary(&self, name: &str, value: &[u8]) -> String {
        self.put(name, StoredSecret::Binary(value.to_vec()))
    }

    fn put(&self, name: &str, secret: StoredSecret) -> String {
        let arn = format!("arn:aws:secretsmanager:us-east-1:000000000000:secret:{name}-AbCdEf");
        let mut state = self.state.lock();
        state
            .secrets
            .insert(arn.clone(), (name.to_string(), secret.clone()));
        state.secrets.insert(name.to_string(), (name.to_string(), secret));
        arn
    }

    /// Number of requests served
    pub fn request_count(&self) -> usize {
        self.state.lock().requests
    }

    /// SDK client pointed at this fake
    pub async fn client(&self) -> aws_sdk_secretsmanager::Client {
        secrets_client(&self.url()).await
    }
}

/// Create a Secrets Manager client for `endpoint` with static test credentials
pub async fn secrets_client(endpoint: &str) -> aws_sdk_secretsmanager::Client {
    let config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(endpoint)
        .credentials_provider(Credentials::new("test", "test", None, None, "test"))
        .region(Region::new("us-east-1"))
        .load()
        .await;

    aws_sdk_secretsmanager::Client::new(&config)
}

// === Request/Response types ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetSecretValueRequest {
    secret_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetSecretValueResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    version_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_binary: Option<String>,
    version_stages: Vec<String>,
    created_date: f64,
}

// === Handlers ===

async fn handle_request(
    State(state): State<Arc<Mutex<SecretsState>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let target = headers
        .get("x-amz-target")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    info!(target = %target, "Secrets Manager request");
    state.lock().requests += 1;

    match target {
        "secretsmanager.GetSecretValue" => handle_get_secret_value(&state, &body),
        _ => {
            warn!(target = %target, "Unknown Secrets Manager operation");
            error_response(
                StatusCode::BAD_REQUEST,
                "UnknownOperationException",
                &format!("Unknown operation: {}", target),
            )
        }
    }
}

fn handle_get_secret_value(state: &Mutex<SecretsState>, body: &Bytes) -> Response {
    let req: GetSecretValueRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "ValidationException",
                &e.to_string(),
            )
        }
    };

    let found = state.lock().secrets.get(&req.secret_id).cloned();
    match found {
        Some((name, secret)) => {
            let (secret_string, secret_binary) = match secret {
                StoredSecret::String(s) => (Some(s), None),
                StoredSecret::Binary(b) => (
                    None,
                    Some(base64::engine::general_purpose::STANDARD.encode(b)),
                ),
            };
            let response = GetSecretValueResponse {
                arn: format!("arn:aws:secretsmanager:us-east-1:000000000000:secret:{name}-AbCdEf"),
                name,
                version_id: uuid::Uuid::new_v4().to_string(),
                secret_string,
                secret_binary,
                version_stages: vec!["AWSCURRENT".to_string()],
                created_date: 1_760_000_000.0,
            };
            json_response(StatusCode::OK, &response)
        }
        None => error_response(
            StatusCode::BAD_REQUEST,
            "ResourceNotFoundException",
            "Secrets Manager can't find the specified secret.",
        ),
    }
}

// === Helpers ===

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/x-amz-json-1.1")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn error_response(status: StatusCode, error_type: &str, message: &str) -> Response {
    let body = serde_json::json!({
        "__type": error_type,
        "message": message
    });
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/x-amz-json-1.1")
        .body(Body::from(body.to_string()))
        .unwrap()
}
