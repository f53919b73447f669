//! Integration tests for the custom resource handler
//!
//! These tests run the handler against in-process fakes of the broker,
//! Secrets Manager and the CloudFormation response URL.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use axum::http::{Method, StatusCode};
use rabbitdefs_core::{CustomResourceRequest, ProvisionError, ResponseStatus, Settings};
use rabbitdefs_provisioner::{InvocationContext, Provisioner, ResponseSender};
use rabbitdefs_secrets::{SecretSource, SecretsManagerSource, StaticSecret};
use rabbitdefs_test::{CallbackRecorder, FakeBroker, FakeSecretsManager};
use serde_json::{json, Value};

const LOG_STREAM: &str = "2026/10/17/[$LATEST]0123456789abcdef";
const SECRET_NAME: &str = "rabbit-admin-password";
const PASSWORD: &str = "s3cr3t";

fn definitions_document() -> Value {
    json!({
        "rabbit_version": "3.13.7",
        "vhosts": [{"name": "/"}],
        "queues": [
            {"name": "orders.created", "vhost": "/", "durable": true, "auto_delete": false, "arguments": {"x-queue-type": "quorum"}},
            {"name": "orders.dead", "vhost": "/", "durable": true, "auto_delete": false, "arguments": {}}
        ],
        "exchanges": [
            {"name": "orders", "vhost": "/", "type": "topic", "durable": true, "auto_delete": false, "internal": false, "arguments": {}}
        ],
        "bindings": [
            {"source": "orders", "vhost": "/", "destination": "orders.created", "destination_type": "queue", "routing_key": "order.created", "arguments": {}}
        ]
    })
}

/// Write `rabbit_config_<environment>.json` into `dir`
fn write_definitions(dir: &Path, environment: &str, document: &Value) {
    std::fs::write(
        dir.join(format!("rabbit_config_{environment}.json")),
        document.to_string(),
    )
    .unwrap();
}

fn environment(task_root: &Path, broker: &FakeBroker, secret_arn: &str) -> HashMap<String, String> {
    [
        ("LAMBDA_TASK_ROOT", task_root.to_str().unwrap().to_string()),
        ("ENVIRONMENT", "test".to_string()),
        ("SECRET_ARN", secret_arn.to_string()),
        ("RABBIT_ENDPOINT", broker.url()),
        ("RABBIT_HTTP_TIMEOUT_SECS", "5".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn provisioner<S: SecretSource>(secrets: S, vars: HashMap<String, String>) -> Provisioner<S> {
    Provisioner::new(secrets)
        .unwrap()
        .with_settings_loader(move || Settings::from_source(vars.clone()))
}

fn request(request_type: &str, callback: &CallbackRecorder) -> CustomResourceRequest {
    serde_json::from_value(json!({
        "RequestType": request_type,
        "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:rabbit-config",
        "ResponseURL": callback.response_url(),
        "StackId": "arn:aws:cloudformation:us-east-1:123456789012:stack/broker/e4bd4c10",
        "RequestId": "c6a42a0e-5a2c-4f1e-9d4b-0d8f4c0d5a11",
        "LogicalResourceId": "RabbitDefinitions",
        "ResourceType": "Custom::RabbitDefinitions",
        "ResourceProperties": {}
    }))
    .unwrap()
}

fn context() -> InvocationContext {
    let mut ctx = InvocationContext::local("lambda-request-1");
    ctx.log_stream_name = LOG_STREAM.to_string();
    ctx
}

#[tokio::test]
async fn test_create_imports_definitions_and_reports_success() {
    let task_root = tempfile::tempdir().unwrap();
    write_definitions(task_root.path(), "test", &definitions_document());

    let broker = FakeBroker::start("rabbit-admin", PASSWORD).await.unwrap();
    let secrets = FakeSecretsManager::start().await.unwrap();
    let secret_arn = secrets.put_string(SECRET_NAME, PASSWORD);
    let callback = CallbackRecorder::start().await.unwrap();

    let handler = provisioner(
        SecretsManagerSource::new(secrets.client().await),
        environment(task_root.path(), &broker, &secret_arn),
    );
    let request = request("Create", &callback);

    let status = handler.handle(&request, &context()).await.unwrap();
    assert_eq!(status, ResponseStatus::Success);

    // The file went to the broker untouched
    assert_eq!(broker.definitions(), Some(definitions_document()));
    assert_eq!(broker.import_count(), 1);
    assert_eq!(broker.export_count(), 1);
    assert_eq!(secrets.request_count(), 1);

    let sent = callback.only();
    assert_eq!(sent.method, Method::PUT);
    assert_eq!(sent.path, "/cloudformation-custom-resource-response");
    assert_eq!(sent.content_type.as_deref().unwrap_or(""), "");
    assert_eq!(sent.content_length, Some(sent.body.len()));

    let body = sent.json();
    assert_eq!(body["Status"], "SUCCESS");
    assert_eq!(body["PhysicalResourceId"], LOG_STREAM);
    assert_eq!(body["StackId"], request.stack_id.as_str());
    assert_eq!(body["RequestId"], request.request_id.as_str());
    assert_eq!(body["LogicalResourceId"], "RabbitDefinitions");
    assert_eq!(body["NoEcho"], false);
    assert_eq!(body["Data"], json!({}));
    assert!(body["Reason"].as_str().unwrap().contains(LOG_STREAM));
}

#[tokio::test]
async fn test_update_keeps_physical_resource_id() {
    let task_root = tempfile::tempdir().unwrap();
    write_definitions(task_root.path(), "test", &definitions_document());

    let broker = FakeBroker::start("rabbit-admin", PASSWORD).await.unwrap();
    let callback = CallbackRecorder::start().await.unwrap();

    let handler = provisioner(
        StaticSecret::new(PASSWORD),
        environment(task_root.path(), &broker, SECRET_NAME),
    );
    let mut request = request("Update", &callback);
    request.physical_resource_id = Some("2026/01/02/[$LATEST]original".to_string());

    let status = handler.handle(&request, &context()).await.unwrap();
    assert_eq!(status, ResponseStatus::Success);
    assert_eq!(broker.import_count(), 1);

    let body = callback.only().json();
    assert_eq!(body["Status"], "SUCCESS");
    assert_eq!(body["PhysicalResourceId"], "2026/01/02/[$LATEST]original");
}

#[tokio::test]
async fn test_json_secret_selects_username() {
    let task_root = tempfile::tempdir().unwrap();
    write_definitions(task_root.path(), "test", &definitions_document());

    let broker = FakeBroker::start("ops-admin", PASSWORD).await.unwrap();
    let callback = CallbackRecorder::start().await.unwrap();

    let handler = provisioner(
        StaticSecret::new(json!({"username": "ops-admin", "password": PASSWORD}).to_string()),
        environment(task_root.path(), &broker, SECRET_NAME),
    );

    let status = handler
        .handle(&request("Create", &callback), &context())
        .await
        .unwrap();
    assert_eq!(status, ResponseStatus::Success);
    assert_eq!(broker.import_count(), 1);
}

#[tokio::test]
async fn test_delete_only_reports_success() {
    let task_root = tempfile::tempdir().unwrap();
    let broker = FakeBroker::start("rabbit-admin", PASSWORD).await.unwrap();
    let secrets = FakeSecretsManager::start().await.unwrap();
    let secret_arn = secrets.put_string(SECRET_NAME, PASSWORD);
    let callback = CallbackRecorder::start().await.unwrap();

    let handler = provisioner(
        SecretsManagerSource::new(secrets.client().await),
        environment(task_root.path(), &broker, &secret_arn),
    );
    let mut request = request("Delete", &callback);
    request.physical_resource_id = Some(LOG_STREAM.to_string());

    let status = handler.handle(&request, &context()).await.unwrap();
    assert_eq!(status, ResponseStatus::Success);

    assert_eq!(broker.import_count(), 0);
    assert_eq!(broker.export_count(), 0);
    assert_eq!(secrets.request_count(), 0);
    assert_eq!(callback.only().json()["Status"], "SUCCESS");
}

#[tokio::test]
async fn test_rejected_credentials_report_failure() {
    let task_root = tempfile::tempdir().unwrap();
    write_definitions(task_root.path(), "test", &definitions_document());

    let broker = FakeBroker::start("rabbit-admin", PASSWORD).await.unwrap();
    let callback = CallbackRecorder::start().await.unwrap();

    let handler = provisioner(
        StaticSecret::new("stale-password"),
        environment(task_root.path(), &broker, SECRET_NAME),
    );

    let status = handler
        .handle(&request("Create", &callback), &context())
        .await
        .unwrap();
    assert_eq!(status, ResponseStatus::Failed);
    assert!(broker.definitions().is_none());

    let body = callback.only().json();
    assert_eq!(body["Status"], "FAILED");
    assert_eq!(body["PhysicalResourceId"], LOG_STREAM);
    let reason = body["Reason"].as_str().unwrap();
    assert!(reason.contains("HTTP 401"), "unexpected reason: {reason}");
    assert!(reason.contains(LOG_STREAM));
    assert!(!reason.contains("stale-password"));
}

#[tokio::test]
async fn test_broker_outage_reports_failure() {
    let task_root = tempfile::tempdir().unwrap();
    write_definitions(task_root.path(), "test", &definitions_document());

    let broker = FakeBroker::start("rabbit-admin", PASSWORD).await.unwrap();
    broker.fail_with(StatusCode::INTERNAL_SERVER_ERROR);
    let callback = CallbackRecorder::start().await.unwrap();

    let handler = provisioner(
        StaticSecret::new(PASSWORD),
        environment(task_root.path(), &broker, SECRET_NAME),
    );

    let status = handler
        .handle(&request("Create", &callback), &context())
        .await
        .unwrap();
    assert_eq!(status, ResponseStatus::Failed);
    assert!(callback.only().json()["Reason"]
        .as_str()
        .unwrap()
        .contains("HTTP 500"));
}

#[tokio::test]
async fn test_missing_definitions_file_skips_secret_lookup() {
    let task_root = tempfile::tempdir().unwrap();
    let broker = FakeBroker::start("rabbit-admin", PASSWORD).await.unwrap();
    let secrets = FakeSecretsManager::start().await.unwrap();
    let secret_arn = secrets.put_string(SECRET_NAME, PASSWORD);
    let callback = CallbackRecorder::start().await.unwrap();

    let handler = provisioner(
        SecretsManagerSource::new(secrets.client().await),
        environment(task_root.path(), &broker, &secret_arn),
    );

    let status = handler
        .handle(&request("Create", &callback), &context())
        .await
        .unwrap();
    assert_eq!(status, ResponseStatus::Failed);
    assert_eq!(secrets.request_count(), 0);
    assert_eq!(broker.import_count(), 0);

    let reason = callback.only().json()["Reason"].as_str().unwrap().to_string();
    assert!(reason.contains("rabbit_config_test.json"), "unexpected reason: {reason}");
}

#[tokio::test]
async fn test_missing_environment_variable_reports_failure() {
    let task_root = tempfile::tempdir().unwrap();
    write_definitions(task_root.path(), "test", &definitions_document());

    let broker = FakeBroker::start("rabbit-admin", PASSWORD).await.unwrap();
    let callback = CallbackRecorder::start().await.unwrap();

    let mut vars = environment(task_root.path(), &broker, SECRET_NAME);
    vars.remove("RABBIT_ENDPOINT");
    let handler = provisioner(StaticSecret::new(PASSWORD), vars);

    let status = handler
        .handle(&request("Update", &callback), &context())
        .await
        .unwrap();
    assert_eq!(status, ResponseStatus::Failed);
    assert_eq!(broker.import_count(), 0);

    let reason = callback.only().json()["Reason"].as_str().unwrap().to_string();
    assert!(reason.contains("rabbit_endpoint"), "unexpected reason: {reason}");
}

#[tokio::test]
async fn test_unknown_request_type_reports_failure() {
    let task_root = tempfile::tempdir().unwrap();
    let broker = FakeBroker::start("rabbit-admin", PASSWORD).await.unwrap();
    let callback = CallbackRecorder::start().await.unwrap();

    let handler = provisioner(
        StaticSecret::new(PASSWORD),
        environment(task_root.path(), &broker, SECRET_NAME),
    );

    let status = handler
        .handle(&request("Rollback", &callback), &context())
        .await
        .unwrap();
    assert_eq!(status, ResponseStatus::Failed);
    assert_eq!(broker.import_count(), 0);

    let body = callback.only().json();
    assert_eq!(body["Status"], "FAILED");
    let reason = body["Reason"].as_str().unwrap();
    assert!(reason.contains("Rollback"), "unexpected reason: {reason}");
    assert!(reason.contains(LOG_STREAM), "unexpected reason: {reason}");
}

#[tokio::test]
async fn test_rejected_callback_is_returned_as_error() {
    let task_root = tempfile::tempdir().unwrap();
    let broker = FakeBroker::start("rabbit-admin", PASSWORD).await.unwrap();
    let callback = CallbackRecorder::start().await.unwrap();
    callback.respond_with(StatusCode::FORBIDDEN);

    let handler = provisioner(
        StaticSecret::new(PASSWORD),
        environment(task_root.path(), &broker, SECRET_NAME),
    );

    let result = handler
        .handle(&request("Delete", &callback), &context())
        .await;
    assert!(matches!(
        result,
        Err(ProvisionError::CallbackStatus { status: 403, .. })
    ));
    assert_eq!(callback.received().len(), 1);
}

#[tokio::test]
async fn test_stalled_callback_times_out() {
    let task_root = tempfile::tempdir().unwrap();
    let broker = FakeBroker::start("rabbit-admin", PASSWORD).await.unwrap();
    let callback = CallbackRecorder::start().await.unwrap();
    callback.respond_after(Duration::from_secs(5));

    let handler = provisioner(
        StaticSecret::new(PASSWORD),
        environment(task_root.path(), &broker, SECRET_NAME),
    )
    .with_sender(ResponseSender::new(Duration::from_millis(200)).unwrap());

    let started = Instant::now();
    let result = handler
        .handle(&request("Delete", &callback), &context())
        .await;

    assert!(
        matches!(result, Err(ProvisionError::Callback(_))),
        "unexpected result: {result:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(callback.received().len(), 1);
}
