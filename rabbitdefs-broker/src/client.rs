//! Management API definitions client

use rabbitdefs_core::{display_chain, Definitions, ProvisionError, Result};
use rabbitdefs_secrets::BrokerCredentials;
use reqwest::{Method, Response};
use std::time::Duration;
use tracing::{debug, info};

/// Client for a broker's `/api/definitions` endpoint
pub struct ManagementClient {
    url: String,
    credentials: BrokerCredentials,
    client: reqwest::Client,
}

impl ManagementClient {
    /// Create a client for the definitions endpoint at `url`
    pub fn new(
        url: impl Into<String>,
        credentials: BrokerCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProvisionError::BrokerRequest {
                method: "INIT",
                url: url.clone(),
                message: display_chain(&e),
            })?;

        Ok(Self {
            url,
            credentials,
            client,
        })
    }

    /// Upload `definitions` to the broker
    pub async fn import_definitions(&self, definitions: &Definitions) -> Result<()> {
        info!(url = %self.url, summary = %definitions.summary(), "Importing definitions");

        let response = self
            .send(self.request(Method::POST).json(definitions), "POST")
            .await?;
        let response = check_status(response, "POST", &self.url).await?;

        info!(status = response.status().as_u16(), "Definitions imported");
        Ok(())
    }

    /// Read the broker's current definitions
    pub async fn export_definitions(&self) -> Result<Definitions> {
        let response = self.send(self.request(Method::GET), "GET").await?;
        let response = check_status(response, "GET", &self.url).await?;

        let body = response.text().await.map_err(|e| self.transport_error("GET", &e))?;
        debug!(body = %body, "Exported definitions");

        serde_json::from_str(&body).map_err(|e| ProvisionError::BrokerRequest {
            method: "GET",
            url: self.url.clone(),
            message: format!("unexpected definitions document: {e}"),
        })
    }

    fn request(&self, method: Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, &self.url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        method: &'static str,
    ) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| self.transport_error(method, &e))
    }

    fn transport_error(&self, method: &'static str, error: &reqwest::Error) -> ProvisionError {
        ProvisionError::BrokerRequest {
            method,
            url: self.url.clone(),
            message: display_chain(error),
        }
    }
}

/// Turn a non-2xx answer into an error carrying the broker's explanation
async fn check_status(response: Response, method: &'static str, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProvisionError::BrokerStatus {
        method,
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}
