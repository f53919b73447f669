//! RabbitMQ definitions document
//!
//! The document is owned by RabbitMQ's management plugin. It is passed
//! through unchanged; the only thing checked locally is that the top level
//! is a JSON object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

use crate::error::{ProvisionError, Result};

/// Broker definitions: vhosts, users, permissions, queues, exchanges, ...
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Definitions(Map<String, Value>);

impl Definitions {
    /// Read and parse a definitions file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path).map_err(|source| ProvisionError::ReadDefinitions {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_slice(&raw).map_err(|source| ProvisionError::InvalidDefinitions {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Count the entries of each well-known section
    pub fn summary(&self) -> DefinitionsSummary {
        let count = |key: &str| {
            self.0
                .get(key)
                .and_then(Value::as_array)
                .map_or(0, Vec::len)
        };

        DefinitionsSummary {
            vhosts: count("vhosts"),
            users: count("users"),
            permissions: count("permissions"),
            queues: count("queues"),
            exchanges: count("exchanges"),
            bindings: count("bindings"),
            policies: count("policies"),
        }
    }
}

impl From<Map<String, Value>> for Definitions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Per-section entry counts, for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefinitionsSummary {
    pub vhosts: usize,
    pub users: usize,
    pub permissions: usize,
    pub queues: usize,
    pub exchanges: usize,
    pub bindings: usize,
    pub policies: usize,
}

impl fmt::Display for DefinitionsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vhosts={} users={} permissions={} queues={} exchanges={} bindings={} policies={}",
            self.vhosts,
            self.users,
            self.permissions,
            self.queues,
            self.exchanges,
            self.bindings,
            self.policies
        )
    }
}
