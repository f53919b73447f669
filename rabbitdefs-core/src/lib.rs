//! Core types for rabbitdefs
//!
//! This crate provides the types shared by every rabbitdefs crate:
//! the CloudFormation custom-resource wire format, handler settings,
//! the RabbitMQ definitions document and the common error type.

pub mod cfn;
pub mod definitions;
pub mod error;
pub mod settings;

pub use cfn::{CustomResourceRequest, CustomResourceResponse, RequestType, ResponseStatus};
pub use definitions::{Definitions, DefinitionsSummary};
pub use error::{display_chain, ProvisionError, Result};
pub use settings::Settings;
