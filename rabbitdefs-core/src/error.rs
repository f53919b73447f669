//! Provisioning error types

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Anything that can go wrong while handling a custom-resource event.
///
/// The `Display` output is what CloudFormation shows as the failure reason,
/// so messages name the resource involved but never include secret values.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Invalid handler configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to read definitions file {}: {source}", .path.display())]
    ReadDefinitions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid definitions file {}: {source}", .path.display())]
    InvalidDefinitions {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to fetch secret {secret_id}: {message}")]
    Secret { secret_id: String, message: String },

    #[error("Secret {0} does not contain a usable password")]
    EmptySecret(String),

    #[error("RabbitMQ request {method} {url} failed: {message}")]
    BrokerRequest {
        method: &'static str,
        url: String,
        message: String,
    },

    #[error("RabbitMQ returned HTTP {status} for {method} {url}: {body}")]
    BrokerStatus {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to send response to CloudFormation: {0}")]
    Callback(String),

    #[error("CloudFormation response URL returned HTTP {status}: {body}")]
    CallbackStatus { status: u16, body: String },

    #[error("Unsupported request type: {0}")]
    UnsupportedRequestType(String),
}

impl ProvisionError {
    /// Short, stable name of the failure, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "Config",
            Self::ReadDefinitions { .. } => "ReadDefinitions",
            Self::InvalidDefinitions { .. } => "InvalidDefinitions",
            Self::Secret { .. } => "Secret",
            Self::EmptySecret(_) => "EmptySecret",
            Self::BrokerRequest { .. } => "BrokerRequest",
            Self::BrokerStatus { .. } => "BrokerStatus",
            Self::Callback(_) => "Callback",
            Self::CallbackStatus { .. } => "CallbackStatus",
            Self::UnsupportedRequestType(_) => "UnsupportedRequestType",
        }
    }

    /// Whether the failure happened while reporting back to CloudFormation
    pub fn is_callback(&self) -> bool {
        matches!(self, Self::Callback(_) | Self::CallbackStatus { .. })
    }
}

/// Render an error with its full source chain, `outer: inner: root`
pub fn display_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_message = cause.to_string();
        if !message.contains(&cause_message) {
            message.push_str(": ");
            message.push_str(&cause_message);
        }
        source = cause.source();
    }
    message
}
