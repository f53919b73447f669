//! CloudFormation custom resource that imports RabbitMQ definitions
//!
//! On Create and Update the bundled definitions file for the current
//! environment is pushed to the broker's management API. Delete is a no-op.
//! Every invocation ends with exactly one response to CloudFormation.

pub mod callback;
pub mod context;
pub mod handler;

pub use callback::ResponseSender;
pub use context::InvocationContext;
pub use handler::Provisioner;
