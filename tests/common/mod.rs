//! Shared fixtures: an in-memory provider and credential sources

#![allow(dead_code)]

use async_trait::async_trait;
use gcp_toolbox::error::{AuthError, ProviderError, ProviderResult};
use gcp_toolbox::gcp::auth::{
    AccessTokenSource, CredentialContext, CredentialResolver, CredentialSource, StaticToken,
};
use gcp_toolbox::ops::{Limits, Services};
use gcp_toolbox::provider::*;
use gcp_toolbox::registry::ToolRegistry;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PROJECT: &str = "p1";
pub const CALL_TIMEOUT: Duration = Duration::from_millis(200);

/// In-memory provider. Scoped data is keyed by zone/region name, global
/// data by "global". Non-scoped calls are gated under keys like "buckets".
#[derive(Default)]
pub struct MockProvider {
    pub zones: Vec<String>,
    pub regions: Vec<String>,
    pub buckets: Mutex<Vec<String>>,
    pub instances: Mutex<HashMap<String, Vec<RawInstance>>>,
    pub disks: HashMap<String, Vec<RawDisk>>,
    pub addresses: HashMap<String, Vec<RawAddress>>,
    pub networks: Vec<RawNetwork>,
    pub subnetworks: HashMap<String, Vec<RawSubnetwork>>,
    pub rules: HashMap<String, Vec<RawForwardingRule>>,
    pub billing: RawBillingInfo,
    pub account: RawBillingAccount,
    pub failing: HashMap<String, ProviderError>,
    pub slow: HashSet<String>,
    pub panicking: HashSet<String>,
    pub calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zones(mut self, zones: &[&str]) -> Self {
        self.zones = zones.iter().map(|z| z.to_string()).collect();
        self
    }

    pub fn with_regions(mut self, regions: &[&str]) -> Self {
        self.regions = regions.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_bucket(self, name: &str) -> Self {
        self.buckets.lock().unwrap().push(name.to_string());
        self
    }

    pub fn with_instance(self, zone: &str, name: &str) -> Self {
        let link = format!("https://compute.test/projects/{}/zones/{}/instances/{}", PROJECT, zone, name);
        self.with_raw_instance(zone, name, &link)
    }

    pub fn with_raw_instance(self, zone: &str, name: &str, self_link: &str) -> Self {
        self.instances
            .lock()
            .unwrap()
            .entry(zone.to_string())
            .or_default()
            .push(RawInstance {
                name: name.to_string(),
                id: Some(format!("{}-id", name)),
                self_link: Some(self_link.to_string()),
                status: Some("RUNNING".to_string()),
                machine_type: Some("e2-medium".to_string()),
            });
        self
    }

    pub fn with_disk(mut self, zone: &str, name: &str, users: &[&str]) -> Self {
        self.disks.entry(zone.to_string()).or_default().push(RawDisk {
            name: name.to_string(),
            size_gb: Some("50".to_string()),
            status: Some("READY".to_string()),
            disk_type: Some(format!("https://compute.test/zones/{}/diskTypes/pd-balanced", zone)),
            users: users.iter().map(|u| u.to_string()).collect(),
            ..Default::default()
        });
        self
    }

    pub fn with_address(mut self, scope: &str, name: &str, ip: &str) -> Self {
        self.addresses.entry(scope.to_string()).or_default().push(RawAddress {
            name: name.to_string(),
            address: Some(ip.to_string()),
            status: Some("RESERVED".to_string()),
            ..Default::default()
        });
        self
    }

    pub fn with_network(mut self, name: &str, subnets: &[(&str, &str)]) -> Self {
        self.networks.push(RawNetwork {
            name: name.to_string(),
            id: Some(format!("{}-id", name)),
            auto_create_subnetworks: Some(false),
            subnetworks: subnets
                .iter()
                .map(|(region, subnet)| {
                    format!(
                        "https://compute.test/projects/{}/regions/{}/subnetworks/{}",
                        PROJECT, region, subnet
                    )
                })
                .collect(),
            ..Default::default()
        });
        for (region, subnet) in subnets {
            self.subnetworks
                .entry(region.to_string())
                .or_default()
                .push(RawSubnetwork {
                    name: subnet.to_string(),
                    network: Some(format!("https://compute.test/global/networks/{}", name)),
                    ip_cidr_range: Some("10.0.0.0/24".to_string()),
                    gateway_address: Some("10.0.0.1".to_string()),
                    ..Default::default()
                });
        }
        self
    }

    pub fn with_rule(mut self, scope: &str, name: &str, scheme: &str) -> Self {
        self.rules.entry(scope.to_string()).or_default().push(RawForwardingRule {
            name: name.to_string(),
            ip_address: Some("34.0.0.1".to_string()),
            ip_protocol: Some("TCP".to_string()),
            load_balancing_scheme: Some(scheme.to_string()),
            ..Default::default()
        });
        self
    }

    pub fn with_billing(mut self, account: Option<&str>) -> Self {
        self.billing = RawBillingInfo {
            billing_account_name: account.map(|a| format!("billingAccounts/{}", a)),
            billing_enabled: Some(account.is_some()),
        };
        self.account = RawBillingAccount {
            name: account.map(|a| format!("billingAccounts/{}", a)),
            display_name: Some("Main account".to_string()),
            currency_code: Some("EUR".to_string()),
            open: Some(true),
        };
        self
    }

    pub fn failing(mut self, key: &str, err: ProviderError) -> Self {
        self.failing.insert(key.to_string(), err);
        self
    }

    pub fn slow(mut self, key: &str) -> Self {
        self.slow.insert(key.to_string());
        self
    }

    pub fn panicking(mut self, key: &str) -> Self {
        self.panicking.insert(key.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn gate(&self, key: &str) -> ProviderResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panicking.contains(key) {
            panic!("provider blew up on {}", key);
        }
        if self.slow.contains(key) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        match self.failing.get(key) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CloudProvider for MockProvider {
    async fn list_zones(&self, _: &CredentialContext) -> ProviderResult<Vec<String>> {
        self.gate("zones").await?;
        Ok(self.zones.clone())
    }

    async fn list_regions(&self, _: &CredentialContext) -> ProviderResult<Vec<String>> {
        self.gate("regions").await?;
        Ok(self.regions.clone())
    }

    async fn list_buckets(&self, _: &CredentialContext) -> ProviderResult<Vec<RawBucket>> {
        self.gate("buckets").await?;
        let buckets = self.buckets.lock().unwrap();
        Ok(buckets
            .iter()
            .map(|name| RawBucket {
                name: name.clone(),
                ..Default::default()
            })
            .collect())
    }

    async fn create_bucket(&self, _: &CredentialContext, bucket: &NewBucket) -> ProviderResult<RawBucket> {
        self.gate("buckets").await?;
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains(&bucket.name) {
            return Err(ProviderError::Conflict("You already own this bucket.".into()));
        }
        buckets.push(bucket.name.clone());
        Ok(RawBucket {
            name: bucket.name.clone(),
            location: Some(bucket.location.clone()),
            ..Default::default()
        })
    }

    async fn delete_bucket(&self, _: &CredentialContext, name: &str) -> ProviderResult<()> {
        self.gate("buckets").await?;
        let mut buckets = self.buckets.lock().unwrap();
        match buckets.iter().position(|b| b == name) {
            Some(i) => {
                buckets.remove(i);
                Ok(())
            },
            None => Err(ProviderError::NotFound("The specified bucket does not exist.".into())),
        }
    }

    async fn list_instances(&self, _: &CredentialContext, zone: &str) -> ProviderResult<Vec<RawInstance>> {
        self.gate(zone).await?;
        let instances = self.instances.lock().unwrap();
        Ok(instances.get(zone).cloned().unwrap_or_default())
    }

    async fn delete_instance(&self, _: &CredentialContext, zone: &str, name: &str) -> ProviderResult<()> {
        self.gate(zone).await?;
        let mut instances = self.instances.lock().unwrap();
        let zone_instances = instances.entry(zone.to_string()).or_default();
        match zone_instances.iter().position(|i| i.name == name) {
            Some(i) => {
                zone_instances.remove(i);
                Ok(())
            },
            None => Err(ProviderError::NotFound(format!(
                "The resource 'projects/{}/zones/{}/instances/{}' was not found",
                PROJECT, zone, name
            ))),
        }
    }

    async fn list_disks(&self, _: &CredentialContext, zone: &str) -> ProviderResult<Vec<RawDisk>> {
        self.gate(zone).await?;
        Ok(self.disks.get(zone).cloned().unwrap_or_default())
    }

    async fn list_addresses(&self, _: &CredentialContext, region: &str) -> ProviderResult<Vec<RawAddress>> {
        self.gate(region).await?;
        Ok(self.addresses.get(region).cloned().unwrap_or_default())
    }

    async fn list_global_addresses(&self, _: &CredentialContext) -> ProviderResult<Vec<RawAddress>> {
        self.gate("global").await?;
        Ok(self.addresses.get("global").cloned().unwrap_or_default())
    }

    async fn list_networks(&self, _: &CredentialContext) -> ProviderResult<Vec<RawNetwork>> {
        self.gate("networks").await?;
        Ok(self.networks.clone())
    }

    async fn list_subnetworks(&self, _: &CredentialContext, region: &str) -> ProviderResult<Vec<RawSubnetwork>> {
        self.gate(region).await?;
        Ok(self.subnetworks.get(region).cloned().unwrap_or_default())
    }

    async fn list_forwarding_rules(
        &self,
        _: &CredentialContext,
        region: &str,
    ) -> ProviderResult<Vec<RawForwardingRule>> {
        self.gate(region).await?;
        Ok(self.rules.get(region).cloned().unwrap_or_default())
    }

    async fn list_global_forwarding_rules(
        &self,
        _: &CredentialContext,
    ) -> ProviderResult<Vec<RawForwardingRule>> {
        self.gate("global").await?;
        Ok(self.rules.get("global").cloned().unwrap_or_default())
    }

    async fn get_billing_info(&self, _: &CredentialContext) -> ProviderResult<RawBillingInfo> {
        self.gate("billing").await?;
        Ok(self.billing.clone())
    }

    async fn get_billing_account(
        &self,
        _: &CredentialContext,
        _account_id: &str,
    ) -> ProviderResult<RawBillingAccount> {
        self.gate("billing").await?;
        Ok(self.account.clone())
    }
}

/// Credential source that counts loads; optionally slow or failing
#[derive(Default)]
pub struct CountingSource {
    pub loads: AtomicUsize,
    pub delay: Duration,
    pub fail_with: Option<AuthError>,
}

impl CountingSource {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSource for CountingSource {
    async fn load(&self, _project_id: &str) -> Result<Arc<dyn AccessTokenSource>, AuthError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        Ok(Arc::new(StaticToken::new("test-token")))
    }
}

pub fn limits() -> Limits {
    Limits {
        call_timeout: CALL_TIMEOUT,
        max_in_flight: 4,
    }
}

pub fn registry_with_source(provider: Arc<MockProvider>, source: Arc<dyn CredentialSource>) -> ToolRegistry {
    let services = Services::new(provider, limits());
    ToolRegistry::with_default_tools(services, Arc::new(CredentialResolver::new(source))).unwrap()
}

pub fn registry(provider: Arc<MockProvider>) -> ToolRegistry {
    registry_with_source(provider, Arc::new(CountingSource::default()))
}

/// A project with one of everything
pub fn populated_provider() -> MockProvider {
    MockProvider::new()
        .with_zones(&["us-central1-a", "us-central1-b"])
        .with_regions(&["us-central1"])
        .with_bucket("existing-bucket")
        .with_instance("us-central1-a", "web-1")
        .with_instance("us-central1-b", "web-2")
        .with_disk(
            "us-central1-a",
            "web-1-boot",
            &["https://compute.test/projects/p1/zones/us-central1-a/instances/web-1"],
        )
        .with_address("global", "lb-ip", "34.1.1.1")
        .with_address("us-central1", "nat-ip", "35.2.2.2")
        .with_network("prod", &[("us-central1", "app")])
        .with_rule("global", "web-fr", "EXTERNAL_MANAGED")
        .with_rule("us-central1", "ilb-fr", "INTERNAL")
        .with_billing(Some("0000AA-BBBBBB-CCCCCC"))
}

/// One valid argument set per tool, with the payload key it answers with
pub fn valid_calls() -> Vec<(&'static str, Value, &'static str)> {
    vec![
        ("list_buckets", json!({ "project_id": PROJECT }), "buckets"),
        (
            "create_bucket",
            json!({ "project_id": PROJECT, "bucket_name": "fresh-bucket", "location": "US" }),
            "message",
        ),
        (
            "delete_bucket",
            json!({ "project_id": PROJECT, "bucket_name": "existing-bucket" }),
            "message",
        ),
        ("list_instances", json!({ "project_id": PROJECT }), "instances"),
        ("list_persistent_disks", json!({ "project_id": PROJECT }), "disks"),
        ("list_ip_addresses", json!({ "project_id": PROJECT }), "addresses"),
        (
            "delete_instance",
            json!({ "project_id": PROJECT, "zone": "us-central1-a", "instance_name": "web-1" }),
            "message",
        ),
        (
            "create_instance",
            json!({
                "project_id": PROJECT,
                "zone": "us-central1-a",
                "instance_name": "web-9",
                "machine_type": "e2-medium",
                "image_family": "debian-12"
            }),
            "message",
        ),
        ("list_vpc_networks_and_subnets", json!({ "project_id": PROJECT }), "networks"),
        ("list_load_balancers", json!({ "project_id": PROJECT }), "load_balancers"),
        ("get_billing_cost", json!({ "project_id": PROJECT }), "total_cost"),
        (
            "get_metrics",
            json!({ "project_id": PROJECT, "metric_type": "compute.googleapis.com/instance/cpu/utilization" }),
            "data",
        ),
    ]
}
