//! Broker credential lookup for rabbitdefs
//!
//! Provides:
//! - the [`SecretSource`] seam the handler fetches secrets through
//! - an AWS Secrets Manager implementation
//! - parsing of the secret value into broker credentials

mod credentials;
mod source;

pub use credentials::BrokerCredentials;
pub use source::{SecretSource, SecretsManagerSource, StaticSecret};
