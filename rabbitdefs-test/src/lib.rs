//! Test utilities for rabbitdefs
//!
//! Provides in-process stand-ins for the services the handler talks to:
//! - a RabbitMQ management API serving `/api/definitions`
//! - a Secrets Manager endpoint answering `GetSecretValue`
//! - a CloudFormation response URL that records what it receives
//!
//! Every fake binds `127.0.0.1:0` and shuts down when dropped.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rabbitdefs_test::FakeBroker;
//!
//! #[tokio::test]
//! async fn test_import() {
//!     let broker = FakeBroker::start("rabbit-admin", "secret").await.unwrap();
//!
//!     // Point the handler at the fake
//!     println!("Broker running at: {}", broker.url());
//! }
//! ```

pub mod broker;
pub mod callback;
pub mod secretsmanager;
pub mod server;

pub use broker::FakeBroker;
pub use callback::{CallbackRecorder, RecordedCallback};
pub use secretsmanager::{secrets_client, FakeSecretsManager};
pub use server::{FakeServer, TestError};
