//! CloudFormation custom-resource request and response types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// CloudFormation rejects response bodies larger than this
pub const MAX_RESPONSE_BYTES: usize = 4096;

const TRUNCATION_MARKER: &str = "...";

/// Lifecycle event that triggered the invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestType {
    Create,
    Update,
    Delete,
    /// Anything CloudFormation may add later
    Other(String),
}

impl RequestType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for RequestType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Create" => Self::Create,
            "Update" => Self::Update,
            "Delete" => Self::Delete,
            _ => Self::Other(s),
        }
    }
}

impl From<RequestType> for String {
    fn from(t: RequestType) -> Self {
        match t {
            RequestType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event sent by CloudFormation to a custom resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceRequest {
    pub request_type: RequestType,
    /// Pre-signed S3 URL the result must be PUT to
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    #[serde(default)]
    pub resource_type: String,
    pub logical_resource_id: String,
    /// Present on Update and Delete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_token: Option<String>,
    #[serde(default = "empty_object")]
    pub resource_properties: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<Value>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Outcome reported back to CloudFormation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}

/// Body PUT to the request's `ResponseURL`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: Map<String, Value>,
}

impl CustomResourceResponse {
    fn new(
        status: ResponseStatus,
        request: &CustomResourceRequest,
        physical_resource_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status,
            reason: reason.into(),
            physical_resource_id: physical_resource_id.into(),
            stack_id: request.stack_id.clone(),
            request_id: request.request_id.clone(),
            logical_resource_id: request.logical_resource_id.clone(),
            no_echo: false,
            data: Map::new(),
        }
    }

    pub fn success(
        request: &CustomResourceRequest,
        physical_resource_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(ResponseStatus::Success, request, physical_resource_id, reason)
    }

    pub fn failed(
        request: &CustomResourceRequest,
        physical_resource_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(ResponseStatus::Failed, request, physical_resource_id, reason)
    }

    /// Serialize the response, shortening `Reason` until the body fits
    /// within [`MAX_RESPONSE_BYTES`].
    pub fn to_body(&self) -> serde_json::Result<String> {
        let mut body = serde_json::to_string(self)?;
        if body.len() <= MAX_RESPONSE_BYTES {
            return Ok(body);
        }

        let mut shortened = self.clone();
        while body.len() > MAX_RESPONSE_BYTES && !shortened.reason.is_empty() {
            let excess = body.len() - MAX_RESPONSE_BYTES;
            let keep = shortened
                .reason
                .len()
                .saturating_sub(excess + TRUNCATION_MARKER.len());
            let kept = truncate_on_char_boundary(&shortened.reason, keep);
            shortened.reason = if kept.is_empty() {
                String::new()
            } else {
                format!("{kept}{TRUNCATION_MARKER}")
            };
            body = serde_json::to_string(&shortened)?;
        }

        Ok(body)
    }
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
