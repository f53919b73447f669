//! Invocation context

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The parts of the Lambda context the handler uses
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub request_id: String,
    pub function_name: String,
    pub log_stream_name: String,
    /// Epoch milliseconds after which the runtime kills the invocation
    pub deadline_ms: u64,
}

impl InvocationContext {
    /// Context for runs outside Lambda
    pub fn local(request_id: impl Into<String>) -> Self {
        let deadline = SystemTime::now() + Duration::from_secs(900);
        Self {
            request_id: request_id.into(),
            function_name: "rabbitdefs".to_string(),
            log_stream_name: "local".to_string(),
            deadline_ms: epoch_millis(deadline),
        }
    }

    /// Get remaining time in milliseconds
    pub fn remaining_time_in_millis(&self) -> u64 {
        self.deadline_ms
            .saturating_sub(epoch_millis(SystemTime::now()))
    }
}

impl From<&lambda_runtime::Context> for InvocationContext {
    fn from(ctx: &lambda_runtime::Context) -> Self {
        Self {
            request_id: ctx.request_id.clone(),
            function_name: ctx.env_config.function_name.clone(),
            log_stream_name: ctx.env_config.log_stream.clone(),
            deadline_ms: ctx.deadline,
        }
    }
}

fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
