//! Broker admin credentials

use serde_json::Value;
use std::fmt;

use rabbitdefs_core::{ProvisionError, Result};

/// Basic-auth credentials for the management API
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerCredentials {
    pub username: String,
    pub password: String,
}

impl BrokerCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Interpret a secret string.
    ///
    /// A JSON object with a string `password` supplies the password, and its
    /// `username` string if there is one, falling back to `default_user`.
    /// Anything else is taken verbatim as the password.
    pub fn from_secret_string(secret_id: &str, raw: &str, default_user: &str) -> Result<Self> {
        let object = serde_json::from_str::<Value>(raw)
            .ok()
            .filter(Value::is_object);

        let (username, password) = match object
            .as_ref()
            .and_then(|o| o.get("password").and_then(Value::as_str).map(|p| (o, p)))
        {
            Some((object, password)) => (
                object
                    .get("username")
                    .and_then(Value::as_str)
                    .filter(|u| !u.is_empty())
                    .unwrap_or(default_user)
                    .to_string(),
                password.to_string(),
            ),
            None => (default_user.to_string(), raw.to_string()),
        };

        if password.is_empty() {
            return Err(ProvisionError::EmptySecret(secret_id.to_string()));
        }

        Ok(Self { username, password })
    }
}

impl fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
