//! Cloud provider seam
//!
//! The domain operations only talk to the provider through [`CloudProvider`].
//! The production implementation is the REST client in [`crate::gcp::client`];
//! tests plug in in-memory fakes.
//!
//! Raw shapes mirror the provider's JSON: everything is optional because the
//! provider omits unset fields.

use crate::error::ProviderResult;
use crate::gcp::auth::CredentialContext;
use crate::models::StorageClass;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVersioning {
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBucket {
    pub name: String,
    pub location: Option<String>,
    pub storage_class: Option<String>,
    pub versioning: Option<RawVersioning>,
    pub time_created: Option<String>,
}

/// Bucket creation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct NewBucket {
    pub name: String,
    pub location: String,
    pub storage_class: StorageClass,
    pub versioning: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstance {
    pub name: String,
    pub id: Option<String>,
    pub self_link: Option<String>,
    pub status: Option<String>,
    pub machine_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDisk {
    pub name: String,
    pub id: Option<String>,
    pub self_link: Option<String>,
    /// int64 values arrive as JSON strings
    pub size_gb: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub disk_type: Option<String>,
    pub creation_timestamp: Option<String>,
    pub physical_block_size_bytes: Option<String>,
    pub source_image: Option<String>,
    pub source_snapshot: Option<String>,
    pub source_disk: Option<String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAddress {
    pub name: String,
    pub address: Option<String>,
    pub self_link: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub users: Vec<String>,
    pub address_type: Option<String>,
    pub network: Option<String>,
    pub subnetwork: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoutingConfig {
    pub routing_mode: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNetwork {
    pub name: String,
    pub id: Option<String>,
    pub self_link: Option<String>,
    pub auto_create_subnetworks: Option<bool>,
    pub routing_config: Option<RawRoutingConfig>,
    /// Subnetwork self links
    #[serde(default)]
    pub subnetworks: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSecondaryRange {
    pub range_name: Option<String>,
    pub ip_cidr_range: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSubnetwork {
    pub name: String,
    pub id: Option<String>,
    pub self_link: Option<String>,
    pub region: Option<String>,
    pub network: Option<String>,
    pub ip_cidr_range: Option<String>,
    pub gateway_address: Option<String>,
    #[serde(default)]
    pub secondary_ip_ranges: Vec<RawSecondaryRange>,
    pub private_ip_google_access: Option<bool>,
    pub purpose: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawForwardingRule {
    pub name: String,
    pub self_link: Option<String>,
    pub region: Option<String>,
    #[serde(rename = "IPAddress")]
    pub ip_address: Option<String>,
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: Option<String>,
    pub network_tier: Option<String>,
    pub load_balancing_scheme: Option<String>,
    pub target: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBillingInfo {
    pub billing_account_name: Option<String>,
    pub billing_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBillingAccount {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub currency_code: Option<String>,
    pub open: Option<bool>,
}

/// List/create/delete primitives per resource type
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Zone names available to the project, in provider order
    async fn list_zones(&self, ctx: &CredentialContext) -> ProviderResult<Vec<String>>;

    /// Region names available to the project, in provider order
    async fn list_regions(&self, ctx: &CredentialContext) -> ProviderResult<Vec<String>>;

    async fn list_buckets(&self, ctx: &CredentialContext) -> ProviderResult<Vec<RawBucket>>;

    async fn create_bucket(
        &self,
        ctx: &CredentialContext,
        bucket: &NewBucket,
    ) -> ProviderResult<RawBucket>;

    async fn delete_bucket(&self, ctx: &CredentialContext, name: &str) -> ProviderResult<()>;

    async fn list_instances(
        &self,
        ctx: &CredentialContext,
        zone: &str,
    ) -> ProviderResult<Vec<RawInstance>>;

    async fn delete_instance(
        &self,
        ctx: &CredentialContext,
        zone: &str,
        name: &str,
    ) -> ProviderResult<()>;

    async fn list_disks(&self, ctx: &CredentialContext, zone: &str) -> ProviderResult<Vec<RawDisk>>;

    async fn list_addresses(
        &self,
        ctx: &CredentialContext,
        region: &str,
    ) -> ProviderResult<Vec<RawAddress>>;

    async fn list_global_addresses(&self, ctx: &CredentialContext)
        -> ProviderResult<Vec<RawAddress>>;

    async fn list_networks(&self, ctx: &CredentialContext) -> ProviderResult<Vec<RawNetwork>>;

    async fn list_subnetworks(
        &self,
        ctx: &CredentialContext,
        region: &str,
    ) -> ProviderResult<Vec<RawSubnetwork>>;

    async fn list_forwarding_rules(
        &self,
        ctx: &CredentialContext,
        region: &str,
    ) -> ProviderResult<Vec<RawForwardingRule>>;

    async fn list_global_forwarding_rules(
        &self,
        ctx: &CredentialContext,
    ) -> ProviderResult<Vec<RawForwardingRule>>;

    async fn get_billing_info(&self, ctx: &CredentialContext) -> ProviderResult<RawBillingInfo>;

    async fn get_billing_account(
        &self,
        ctx: &CredentialContext,
        account_id: &str,
    ) -> ProviderResult<RawBillingAccount>;
}
