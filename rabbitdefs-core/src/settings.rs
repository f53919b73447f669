//! Handler settings, read from the Lambda environment

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// Settings the handler needs on every Create/Update
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directory the deployment package is unpacked into
    pub lambda_task_root: PathBuf,

    /// Deployment environment, selects the bundled definitions file
    pub environment: String,

    /// Secrets Manager id holding the broker admin password
    pub secret_arn: String,

    /// Broker management host, e.g. `b-1234.mq.us-east-1.amazonaws.com`
    pub rabbit_endpoint: String,

    #[serde(default = "default_admin_user")]
    pub rabbit_admin_user: String,

    #[serde(default = "default_http_timeout_secs")]
    pub rabbit_http_timeout_secs: u64,
}

/// Just the HTTP timeout, for callers that must not depend on the other
/// variables being present
#[derive(Debug, Deserialize)]
struct HttpTimeout {
    #[serde(default = "default_http_timeout_secs")]
    rabbit_http_timeout_secs: u64,
}

fn default_admin_user() -> String {
    "rabbit-admin".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Ok(load(config::Environment::default())?)
    }

    /// Load settings from an explicit variable map instead of the process
    /// environment
    pub fn from_source(vars: HashMap<String, String>) -> Result<Self> {
        Ok(load(config::Environment::default().source(Some(vars)))?)
    }

    /// `RABBIT_HTTP_TIMEOUT_SECS` from the process environment. Falls back to
    /// the default when unset or unparsable, so it is usable even when the
    /// full settings cannot be loaded.
    pub fn http_timeout_from_env() -> Duration {
        http_timeout(config::Environment::default())
    }

    pub fn http_timeout_from_source(vars: HashMap<String, String>) -> Duration {
        http_timeout(config::Environment::default().source(Some(vars)))
    }

    /// Path of the bundled definitions file for this environment
    pub fn definitions_path(&self) -> PathBuf {
        self.lambda_task_root
            .join(format!("rabbit_config_{}.json", self.environment))
    }

    /// Management API definitions endpoint. Bare hosts are reached over https.
    pub fn definitions_url(&self) -> String {
        let endpoint = self.rabbit_endpoint.trim().trim_end_matches('/');
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            format!("{endpoint}/api/definitions")
        } else {
            format!("https://{endpoint}/api/definitions")
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.rabbit_http_timeout_secs)
    }
}

fn load<T: DeserializeOwned>(
    environment: config::Environment,
) -> std::result::Result<T, config::ConfigError> {
    config::Config::builder()
        .add_source(environment)
        .build()?
        .try_deserialize::<T>()
}

fn http_timeout(environment: config::Environment) -> Duration {
    let secs = load::<HttpTimeout>(environment)
        .map_or_else(|_| default_http_timeout_secs(), |t| t.rabbit_http_timeout_secs);
    Duration::from_secs(secs)
}
