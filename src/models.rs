//! Resource records
//!
//! Flat, serializable shapes returned by the domain operations. Fields the
//! provider did not report stay `None` and serialize as `null`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Partition a resource lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Region(String),
    Zone(String),
}

impl Scope {
    /// Stable label used in logs and partial-failure details
    pub fn label(&self) -> &str {
        match self {
            Self::Global => "global",
            Self::Region(name) | Self::Zone(name) => name,
        }
    }

    /// Region of a regional or zonal scope, `None` for global resources
    pub fn region(&self) -> Option<String> {
        match self {
            Self::Global => None,
            Self::Region(region) => Some(region.clone()),
            Self::Zone(zone) => Some(region_of_zone(zone)),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        match self {
            Self::Global => ScopeKind::Global,
            Self::Region(_) => ScopeKind::Regional,
            Self::Zone(_) => ScopeKind::Zonal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Global,
    Regional,
    Zonal,
}

// =============================================================================
// Closed value sets
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageClass {
    #[default]
    Standard,
    Nearline,
    Coldline,
    Archive,
}

impl StorageClass {
    pub const NAMES: &'static [&'static str] = &["STANDARD", "NEARLINE", "COLDLINE", "ARCHIVE"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Nearline => "NEARLINE",
            Self::Coldline => "COLDLINE",
            Self::Archive => "ARCHIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AddressType {
    External,
    Internal,
}

impl AddressType {
    /// Provider `addressType`; unset or unrecognised values stay unknown
    pub fn from_provider(value: Option<&str>) -> Option<Self> {
        match value? {
            "INTERNAL" => Some(Self::Internal),
            "EXTERNAL" => Some(Self::External),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoadBalancerType {
    External,
    Internal,
}

impl LoadBalancerType {
    pub fn from_scheme(scheme: Option<&str>) -> Self {
        match scheme {
            Some("EXTERNAL") | Some("EXTERNAL_MANAGED") => Self::External,
            _ => Self::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Mean,
    Max,
    Min,
    Sum,
    Count,
}

impl Aggregation {
    pub const NAMES: &'static [&'static str] = &["mean", "max", "min", "sum", "count"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingGroup {
    Service,
    Sku,
    Project,
    Location,
}

impl BillingGroup {
    pub const NAMES: &'static [&'static str] = &["service", "sku", "project", "location"];
}

// =============================================================================
// Compute
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachedInstance {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistentDisk {
    pub name: String,
    pub id: Option<String>,
    pub size_gb: Option<u64>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub disk_type: Option<String>,
    pub zone: String,
    pub region: String,
    pub in_use: bool,
    pub attached_to: Vec<AttachedInstance>,
    pub creation_timestamp: Option<String>,
    pub physical_block_size_bytes: Option<u64>,
    pub source_image: Option<String>,
    pub source_snapshot: Option<String>,
    pub source_disk: Option<String>,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpAddress {
    pub name: String,
    pub address: Option<String>,
    pub scope: ScopeKind,
    /// `None` for global addresses
    pub region: Option<String>,
    pub status: Option<String>,
    pub in_use: bool,
    pub used_by: Vec<String>,
    #[serde(rename = "type")]
    pub address_type: Option<AddressType>,
    pub network: Option<String>,
    pub subnet: Option<String>,
}

// =============================================================================
// Network
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecondaryRange {
    pub range_name: Option<String>,
    pub ip_cidr_range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subnet {
    pub name: String,
    pub id: Option<String>,
    /// `None` when the subnetwork link carries no region segment
    pub region: Option<String>,
    pub network: Option<String>,
    pub ip_cidr_range: Option<String>,
    pub gateway_address: Option<String>,
    pub secondary_ip_ranges: Vec<SecondaryRange>,
    pub private_ip_google_access: Option<bool>,
    pub purpose: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VpcNetwork {
    pub name: String,
    pub id: Option<String>,
    pub auto_create_subnetworks: Option<bool>,
    pub routing_mode: Option<String>,
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadBalancer {
    pub name: String,
    pub scope: ScopeKind,
    /// `None` for global forwarding rules
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub lb_type: LoadBalancerType,
    pub ip_address: Option<String>,
    pub ip_protocol: Option<String>,
    pub network_tier: Option<String>,
    pub load_balancing_scheme: Option<String>,
    pub target: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// Billing / Monitoring
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAmount {
    pub amount: f64,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingCost {
    pub project_id: String,
    pub billing_account_id: String,
    pub billing_account_name: Option<String>,
    pub time_range: TimeRange,
    pub total_cost: CostAmount,
    pub costs_by_service: BTreeMap<String, CostAmount>,
    pub group_by: Vec<BillingGroup>,
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub message: String,
    pub project_id: String,
    pub metric_type: String,
    pub interval: String,
    pub interval_seconds: u64,
    pub aggregation: Aggregation,
    pub data: serde_json::Map<String, serde_json::Value>,
    pub placeholder: bool,
}

// =============================================================================
// Helpers
// =============================================================================

/// Extract short name from GCP resource URL
/// e.g., "https://www.googleapis.com/compute/v1/projects/my-project/zones/us-central1-a" -> "us-central1-a"
pub fn short_name(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

/// "us-central1-a" -> "us-central1"
pub fn region_of_zone(zone: &str) -> String {
    match zone.rsplit_once('-') {
        Some((region, _)) => region.to_string(),
        None => zone.to_string(),
    }
}

/// Pull the `regions/<name>` segment out of a regional resource URL
pub fn region_of_url(url: &str) -> Option<String> {
    let mut parts = url.split('/');
    while let Some(part) = parts.next() {
        if part == "regions" {
            return parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        assert_eq!(
            short_name("https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a"),
            "us-central1-a"
        );
        assert_eq!(short_name("plain"), "plain");
    }

    #[test]
    fn test_region_of_zone() {
        assert_eq!(region_of_zone("us-central1-a"), "us-central1");
        assert_eq!(region_of_zone("europe-west4-c"), "europe-west4");
    }

    #[test]
    fn test_region_of_url() {
        let url = "https://www.googleapis.com/compute/v1/projects/p/regions/us-east1/subnetworks/s1";
        assert_eq!(region_of_url(url).as_deref(), Some("us-east1"));
        assert_eq!(region_of_url("projects/p/global/networks/n"), None);
    }

    #[test]
    fn test_global_scope_has_no_region() {
        assert_eq!(Scope::Global.region(), None);
        assert_eq!(Scope::Zone("us-west1-b".into()).region().as_deref(), Some("us-west1"));
        assert_eq!(Scope::Region("us-west1".into()).label(), "us-west1");
    }

    #[test]
    fn test_global_load_balancer_serializes_null_region() {
        let lb = LoadBalancer {
            name: "web".into(),
            scope: ScopeKind::Global,
            region: None,
            lb_type: LoadBalancerType::External,
            ip_address: Some("34.1.2.3".into()),
            ip_protocol: Some("TCP".into()),
            network_tier: None,
            load_balancing_scheme: Some("EXTERNAL".into()),
            target: None,
            description: None,
        };
        let value = serde_json::to_value(&lb).unwrap();
        assert!(value.get("region").unwrap().is_null());
        assert_eq!(value["scope"], "global");
        assert_eq!(value["type"], "EXTERNAL");
    }

    #[test]
    fn test_lb_type_from_scheme() {
        assert_eq!(LoadBalancerType::from_scheme(Some("EXTERNAL_MANAGED")), LoadBalancerType::External);
        assert_eq!(LoadBalancerType::from_scheme(Some("INTERNAL_MANAGED")), LoadBalancerType::Internal);
        assert_eq!(LoadBalancerType::from_scheme(None), LoadBalancerType::Internal);
    }
}
