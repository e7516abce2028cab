//! gcp-toolbox
//!
//! Typed, validated Google Cloud operations exposed as named tools. Every
//! call goes through [`registry::ToolRegistry::invoke`] and comes back as one
//! [`envelope::Envelope`].

pub mod config;
pub mod envelope;
pub mod error;
pub mod gcp;
pub mod models;
pub mod ops;
pub mod provider;
pub mod registry;
pub mod tools;
pub mod validate;
