//! Secret sources

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;
use tracing::{debug, info};

use rabbitdefs_core::{ProvisionError, Result};

/// Where the broker admin secret comes from
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch the current string value of `secret_id`
    async fn fetch(&self, secret_id: &str) -> Result<String>;
}

/// AWS Secrets Manager backed source
#[derive(Debug, Clone)]
pub struct SecretsManagerSource {
    client: Client,
}

impl SecretsManagerSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the Lambda execution role's environment
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl SecretSource for SecretsManagerSource {
    async fn fetch(&self, secret_id: &str) -> Result<String> {
        debug!(secret_id = %secret_id, "Fetching secret");

        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| ProvisionError::Secret {
                secret_id: secret_id.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        info!(
            secret_id = %secret_id,
            version_id = output.version_id().unwrap_or("-"),
            "Fetched secret"
        );

        // Binary secrets carry no password we can use
        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| ProvisionError::EmptySecret(secret_id.to_string()))
    }
}

/// Fixed secret value, for local runs and tests
#[derive(Clone)]
pub struct StaticSecret(String);

impl StaticSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl std::fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticSecret(***)")
    }
}

#[async_trait]
impl SecretSource for StaticSecret {
    async fn fetch(&self, _secret_id: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}
