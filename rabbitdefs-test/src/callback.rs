//! Fake CloudFormation response URL

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    Router,
};
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::server::{FakeServer, TestError};

/// One request received by the recorder
#[derive(Debug, Clone)]
pub struct RecordedCallback {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub content_length: Option<usize>,
    pub body: Bytes,
}

impl RecordedCallback {
    /// Body parsed as JSON, `Null` if it is not JSON
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

struct RecorderState {
    received: Vec<RecordedCallback>,
    status: StatusCode,
    delay: Option<Duration>,
}

/// Records every request sent to any path
pub struct CallbackRecorder {
    state: Arc<Mutex<RecorderState>>,
    server: FakeServer,
}

impl CallbackRecorder {
    pub async fn start() -> Result<Self, TestError> {
        let state = Arc::new(Mutex::new(RecorderState {
            received: Vec::new(),
            status: StatusCode::OK,
            delay: None,
        }));

        let router = Router::new().fallback(record).with_state(state.clone());
        let server = FakeServer::spawn("cloudformation-callback", router).await?;

        Ok(Self { state, server })
    }

    /// A pre-signed-looking URL pointing at this recorder
    pub fn response_url(&self) -> String {
        format!(
            "{}/cloudformation-custom-resource-response?X-Amz-Signature=test",
            self.server.url()
        )
    }

    /// Answer subsequent requests with `status`
    pub fn respond_with(&self, status: StatusCode) {
        self.state.lock().status = status;
    }

    /// Hold each reply for `delay` after recording the request
    pub fn respond_after(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    pub fn received(&self) -> Vec<RecordedCallback> {
        self.state.lock().received.clone()
    }

    /// The single request received; panics if there were zero or several
    pub fn only(&self) -> RecordedCallback {
        let received = self.received();
        assert_eq!(received.len(), 1, "expected exactly one callback");
        received[0].clone()
    }
}

async fn record(
    State(state): State<Arc<Mutex<RecorderState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());

    let (status, delay) = {
        let mut state = state.lock();
        state.received.push(RecordedCallback {
            method,
            path: uri.path().to_string(),
            content_type,
            content_length,
            body,
        });
        (state.status, state.delay)
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    status
}
