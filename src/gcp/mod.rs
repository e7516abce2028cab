//! GCP API interaction module
//!
//! This module provides the concrete provider behind the tool layer:
//! authentication, HTTP transport, and the REST client.
//!
//! # Module Structure
//!
//! - [`auth`] - Credential discovery and the per-project credential cache
//! - [`client`] - REST implementation of [`crate::provider::CloudProvider`]
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use crate::gcp::auth::{AdcSource, CredentialResolver};
//! use crate::gcp::client::{Endpoints, GcpClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let resolver = CredentialResolver::new(Arc::new(AdcSource::new(None, timeout)));
//!     let ctx = resolver.resolve("my-project").await?;
//!     let client = GcpClient::new(Endpoints::default(), timeout)?;
//!     let zones = client.list_zones(&ctx).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
