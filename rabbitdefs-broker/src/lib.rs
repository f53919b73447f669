//! RabbitMQ management API client for rabbitdefs
//!
//! Only the definitions endpoint is used: import pushes a document,
//! export reads back what the broker holds afterwards.

pub mod client;

pub use client::ManagementClient;
