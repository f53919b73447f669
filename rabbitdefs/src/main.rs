//! rabbitdefs - RabbitMQ definitions custom resource
//!
//! Runs under the Lambda runtime by default. With `--event` it handles a
//! single CloudFormation event read from a file, which is how the handler is
//! exercised by hand.

use anyhow::Context;
use clap::Parser;
use lambda_runtime::{service_fn, LambdaEvent};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rabbitdefs_core::{CustomResourceRequest, ResponseStatus};
use rabbitdefs_provisioner::{InvocationContext, Provisioner};
use rabbitdefs_secrets::{SecretSource, SecretsManagerSource};

#[derive(Parser, Debug)]
#[command(name = "rabbitdefs")]
#[command(about = "Imports RabbitMQ definitions for a CloudFormation custom resource", long_about = None)]
struct Args {
    /// Handle one custom resource event from this file, then exit
    #[arg(long, env = "RABBITDEFS_EVENT_FILE")]
    event: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RABBITDEFS_LOG_LEVEL")]
    log_level: String,
}

/// Value returned to the Lambda caller
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InvocationOutput {
    status: ResponseStatus,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // CloudWatch timestamps each line already
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(&args.log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .without_time(),
        )
        .init();

    let secrets = SecretsManagerSource::from_env().await;
    let provisioner = Provisioner::new(secrets)?;

    if let Some(path) = args.event {
        return run_once(&provisioner, &path).await;
    }

    info!("Starting Lambda runtime");
    let provisioner = Arc::new(provisioner);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<CustomResourceRequest>| {
        let provisioner = provisioner.clone();
        async move { handle_event(&provisioner, event).await }
    }))
    .await
    .map_err(|e| anyhow::anyhow!("Lambda runtime failed: {e}"))
}

/// Filter used when `RUST_LOG` is unset. The binary target is `bootstrap`,
/// so its own events are enabled alongside the library crates.
fn default_directives(level: &str) -> String {
    format!("warn,rabbitdefs={level},bootstrap={level}")
}

async fn handle_event<S: SecretSource>(
    provisioner: &Provisioner<S>,
    event: LambdaEvent<CustomResourceRequest>,
) -> Result<InvocationOutput, lambda_runtime::Error> {
    let (request, context) = event.into_parts();
    let ctx = InvocationContext::from(&context);

    let status = provisioner.handle(&request, &ctx).await.map_err(|e| {
        if e.is_callback() {
            error!(
                request_id = %request.request_id,
                "CloudFormation was not notified; report the result manually via the logged ResponseURL"
            );
        }
        e
    })?;
    Ok(InvocationOutput { status })
}

/// Handle the event in `path`. A `FAILED` outcome is an error so the process
/// exits non-zero.
async fn run_once<S: SecretSource>(
    provisioner: &Provisioner<S>,
    path: &Path,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read event file {}", path.display()))?;
    let request: CustomResourceRequest =
        serde_json::from_slice(&raw).context("Event file is not a custom resource request")?;

    let ctx = InvocationContext::local(request.request_id.clone());
    let status = provisioner.handle(&request, &ctx).await?;

    println!("{status}");
    if status == ResponseStatus::Failed {
        anyhow::bail!("Custom resource request {} failed", request.request_id);
    }
    Ok(())
}
