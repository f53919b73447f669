//! CloudFormation response delivery

use rabbitdefs_core::{display_chain, CustomResourceResponse, ProvisionError, Result};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, info};

/// PUTs custom-resource responses to their pre-signed URL
pub struct ResponseSender {
    client: reqwest::Client,
}

impl ResponseSender {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProvisionError::Callback(display_chain(&e)))?;
        Ok(Self { client })
    }

    /// Deliver `response`. The URL is signed without a content type, so the
    /// request must carry an empty one.
    pub async fn send(&self, response_url: &str, response: &CustomResourceResponse) -> Result<()> {
        let body = response
            .to_body()
            .map_err(|e| ProvisionError::Callback(e.to_string()))?;

        debug!(body = %body, "Response body");
        info!(
            status = %response.status,
            physical_resource_id = %response.physical_resource_id,
            "Sending response to CloudFormation"
        );

        let reply = self
            .client
            .put(response_url)
            .header(CONTENT_TYPE, "")
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await
            .map_err(|e| ProvisionError::Callback(display_chain(&e)))?;

        let status = reply.status();
        if !status.is_success() {
            let body = reply.text().await.unwrap_or_default();
            return Err(ProvisionError::CallbackStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
