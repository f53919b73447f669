//! Custom resource handler

use rabbitdefs_broker::ManagementClient;
use rabbitdefs_core::{
    CustomResourceRequest, CustomResourceResponse, Definitions, DefinitionsSummary,
    ProvisionError, RequestType, ResponseStatus, Result, Settings,
};
use rabbitdefs_secrets::{BrokerCredentials, SecretSource};
use tracing::{error, info, warn};

use crate::callback::ResponseSender;
use crate::context::InvocationContext;

type SettingsLoader = Box<dyn Fn() -> Result<Settings> + Send + Sync>;

/// Pushes the bundled definitions to the broker and reports to CloudFormation
pub struct Provisioner<S> {
    secrets: S,
    sender: ResponseSender,
    load_settings: SettingsLoader,
}

impl<S: SecretSource> Provisioner<S> {
    /// Handler reading its settings from the process environment.
    ///
    /// The callback timeout is read up front so that a response can still be
    /// sent when the remaining settings are missing.
    pub fn new(secrets: S) -> Result<Self> {
        let sender = ResponseSender::new(Settings::http_timeout_from_env())?;
        Ok(Self {
            secrets,
            sender,
            load_settings: Box::new(Settings::from_env),
        })
    }

    /// Replace how settings are obtained on each invocation
    pub fn with_settings_loader(
        mut self,
        loader: impl Fn() -> Result<Settings> + Send + Sync + 'static,
    ) -> Self {
        self.load_settings = Box::new(loader);
        self
    }

    pub fn with_sender(mut self, sender: ResponseSender) -> Self {
        self.sender = sender;
        self
    }

    /// Handle one event and report the outcome to CloudFormation.
    ///
    /// Provisioning failures become a `FAILED` response and are not returned
    /// as errors. An error is returned only when the response itself could
    /// not be delivered.
    pub async fn handle(
        &self,
        request: &CustomResourceRequest,
        ctx: &InvocationContext,
    ) -> Result<ResponseStatus> {
        // Everything needed to report by hand if the callback never arrives
        info!(
            request_type = %request.request_type,
            stack_id = %request.stack_id,
            logical_resource_id = %request.logical_resource_id,
            request_id = %request.request_id,
            response_url = %request.response_url,
            "Received custom resource request"
        );
        info!(
            function = %ctx.function_name,
            aws_request_id = %ctx.request_id,
            log_stream = %ctx.log_stream_name,
            remaining_ms = ctx.remaining_time_in_millis(),
            "Invocation context"
        );

        let physical_resource_id = request
            .physical_resource_id
            .clone()
            .unwrap_or_else(|| ctx.log_stream_name.clone());

        let response = match &request.request_type {
            RequestType::Create | RequestType::Update => match self.provision().await {
                Ok(summary) => {
                    info!(summary = %summary, "RabbitMQ configured");
                    CustomResourceResponse::success(
                        request,
                        physical_resource_id,
                        log_stream_reason(ctx),
                    )
                }
                Err(e) => {
                    error!(error = %e, kind = e.kind(), "Failed to configure RabbitMQ");
                    CustomResourceResponse::failed(
                        request,
                        physical_resource_id,
                        format!("{e}. {}", log_stream_reason(ctx)),
                    )
                }
            },
            RequestType::Delete => {
                info!("Delete leaves broker definitions in place");
                CustomResourceResponse::success(
                    request,
                    physical_resource_id,
                    log_stream_reason(ctx),
                )
            }
            RequestType::Other(other) => {
                let e = ProvisionError::UnsupportedRequestType(other.clone());
                warn!(error = %e, "Rejecting request");
                CustomResourceResponse::failed(
                    request,
                    physical_resource_id,
                    format!("{e}. {}", log_stream_reason(ctx)),
                )
            }
        };

        if let Err(e) = self.sender.send(&request.response_url, &response).await {
            error!(error = %e, status = %response.status, "Failed to report to CloudFormation");
            return Err(e);
        }

        info!(status = %response.status, "Reported to CloudFormation");
        Ok(response.status)
    }

    async fn provision(&self) -> Result<DefinitionsSummary> {
        let settings = (self.load_settings)()?;
        info!(
            environment = %settings.environment,
            endpoint = %settings.rabbit_endpoint,
            "Settings loaded"
        );

        let path = settings.definitions_path();
        let definitions = Definitions::load(&path)?;
        info!(
            path = %path.display(),
            summary = %definitions.summary(),
            "Loaded definitions"
        );

        let secret = self.secrets.fetch(&settings.secret_arn).await?;
        let credentials = BrokerCredentials::from_secret_string(
            &settings.secret_arn,
            &secret,
            &settings.rabbit_admin_user,
        )?;

        let client = ManagementClient::new(
            settings.definitions_url(),
            credentials,
            settings.http_timeout(),
        )?;
        client.import_definitions(&definitions).await?;

        let exported = client.export_definitions().await?;
        Ok(exported.summary())
    }
}

fn log_stream_reason(ctx: &InvocationContext) -> String {
    format!(
        "See the details in CloudWatch Log Stream: {}",
        ctx.log_stream_name
    )
}
