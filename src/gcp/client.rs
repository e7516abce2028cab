//! GCP Client
//!
//! REST implementation of [`CloudProvider`], combining the per-call
//! credential context with the HTTP transport.

use super::http::GcpHttpClient;
use crate::error::{AuthError, ProviderError, ProviderResult};
use crate::gcp::auth::CredentialContext;
use crate::provider::{
    CloudProvider, NewBucket, RawAddress, RawBillingAccount, RawBillingInfo, RawBucket, RawDisk,
    RawForwardingRule, RawInstance, RawNetwork, RawSubnetwork,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Upper bound on pages fetched for a single list call
const MAX_PAGES: usize = 100;

/// API base URLs, overridable to point at a test server
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub compute: String,
    pub storage: String,
    pub billing: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            compute: "https://compute.googleapis.com/compute/v1".to_string(),
            storage: "https://storage.googleapis.com/storage/v1".to_string(),
            billing: "https://cloudbilling.googleapis.com/v1".to_string(),
        }
    }
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    http: GcpHttpClient,
    endpoints: Endpoints,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

impl GcpClient {
    /// Create a new GCP client
    pub fn new(endpoints: Endpoints, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: GcpHttpClient::new(timeout)?,
            endpoints,
        })
    }

    async fn token(&self, ctx: &CredentialContext) -> ProviderResult<String> {
        ctx.access_token().await.map_err(|e| match e {
            AuthError::Unreachable(m) => ProviderError::Unavailable(m),
            other => ProviderError::Unauthenticated(other.to_string()),
        })
    }

    /// Make a GET request to a GCP API
    async fn get(&self, ctx: &CredentialContext, url: &str) -> ProviderResult<Value> {
        let token = self.token(ctx).await?;
        self.http.get(url, &token).await
    }

    /// Make a POST request to a GCP API
    async fn post(&self, ctx: &CredentialContext, url: &str, body: &Value) -> ProviderResult<Value> {
        let token = self.token(ctx).await?;
        self.http.post(url, &token, Some(body)).await
    }

    /// Make a DELETE request to a GCP API
    async fn delete(&self, ctx: &CredentialContext, url: &str) -> ProviderResult<Value> {
        let token = self.token(ctx).await?;
        self.http.delete(url, &token).await
    }

    /// Fetch all pages of a list endpoint (auto-paginate on `nextPageToken`)
    async fn list_all<T: DeserializeOwned>(
        &self,
        ctx: &CredentialContext,
        url: &str,
    ) -> ProviderResult<Vec<T>> {
        let mut all_items = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page_url = with_page_token(url, page_token.as_deref())?;
            let response = self.get(ctx, &page_url).await?;
            let page: Page<T> = decode(response)?;
            all_items.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(all_items),
            }
        }

        tracing::warn!("Stopped paginating {} after {} pages", url, MAX_PAGES);
        Ok(all_items)
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build Compute Engine API URL
    pub fn compute_url(&self, project: &str, path: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.endpoints.compute,
            urlencoding::encode(project),
            path
        )
    }

    /// Build zonal Compute Engine API URL
    pub fn compute_zonal_url(&self, project: &str, zone: &str, resource: &str) -> String {
        self.compute_url(project, &format!("zones/{}/{}", urlencoding::encode(zone), resource))
    }

    /// Build regional Compute Engine API URL
    pub fn compute_regional_url(&self, project: &str, region: &str, resource: &str) -> String {
        self.compute_url(project, &format!("regions/{}/{}", urlencoding::encode(region), resource))
    }

    /// Build global Compute Engine API URL
    pub fn compute_global_url(&self, project: &str, resource: &str) -> String {
        self.compute_url(project, &format!("global/{}", resource))
    }

    // =========================================================================
    // Cloud Storage API helpers
    // =========================================================================

    /// Build Cloud Storage API URL
    pub fn storage_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.storage, path)
    }

    /// Build Cloud Storage bucket URL
    pub fn storage_bucket_url(&self, bucket: &str) -> String {
        self.storage_url(&format!("b/{}", urlencoding::encode(bucket)))
    }

    // =========================================================================
    // Cloud Billing API helpers
    // =========================================================================

    /// Build Cloud Billing API URL
    pub fn billing_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.billing, path)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> ProviderResult<T> {
    serde_json::from_value(value)
        .map_err(|e| ProviderError::Unexpected(format!("Unexpected response shape: {}", e)))
}

fn with_page_token(url: &str, page_token: Option<&str>) -> ProviderResult<String> {
    let Some(token) = page_token else {
        return Ok(url.to_string());
    };
    let mut parsed = url::Url::parse(url)
        .map_err(|e| ProviderError::Unexpected(format!("Invalid URL {}: {}", url, e)))?;
    parsed.query_pairs_mut().append_pair("pageToken", token);
    Ok(parsed.to_string())
}

#[async_trait]
impl CloudProvider for GcpClient {
    async fn list_zones(&self, ctx: &CredentialContext) -> ProviderResult<Vec<String>> {
        let url = self.compute_url(ctx.project_id(), "zones");
        let zones: Vec<Named> = self.list_all(ctx, &url).await?;
        Ok(zones.into_iter().map(|z| z.name).collect())
    }

    async fn list_regions(&self, ctx: &CredentialContext) -> ProviderResult<Vec<String>> {
        let url = self.compute_url(ctx.project_id(), "regions");
        let regions: Vec<Named> = self.list_all(ctx, &url).await?;
        Ok(regions.into_iter().map(|r| r.name).collect())
    }

    async fn list_buckets(&self, ctx: &CredentialContext) -> ProviderResult<Vec<RawBucket>> {
        let url = format!(
            "{}?project={}",
            self.storage_url("b"),
            urlencoding::encode(ctx.project_id())
        );
        self.list_all(ctx, &url).await
    }

    async fn create_bucket(
        &self,
        ctx: &CredentialContext,
        bucket: &NewBucket,
    ) -> ProviderResult<RawBucket> {
        let url = format!(
            "{}?project={}",
            self.storage_url("b"),
            urlencoding::encode(ctx.project_id())
        );
        let body = json!({
            "name": bucket.name,
            "location": bucket.location,
            "storageClass": bucket.storage_class.as_str(),
            "versioning": { "enabled": bucket.versioning },
        });
        let response = self.post(ctx, &url, &body).await?;
        decode(response)
    }

    async fn delete_bucket(&self, ctx: &CredentialContext, name: &str) -> ProviderResult<()> {
        self.delete(ctx, &self.storage_bucket_url(name)).await?;
        Ok(())
    }

    async fn list_instances(
        &self,
        ctx: &CredentialContext,
        zone: &str,
    ) -> ProviderResult<Vec<RawInstance>> {
        let url = self.compute_zonal_url(ctx.project_id(), zone, "instances");
        self.list_all(ctx, &url).await
    }

    async fn delete_instance(
        &self,
        ctx: &CredentialContext,
        zone: &str,
        name: &str,
    ) -> ProviderResult<()> {
        let url = self.compute_zonal_url(
            ctx.project_id(),
            zone,
            &format!("instances/{}", urlencoding::encode(name)),
        );
        self.delete(ctx, &url).await?;
        Ok(())
    }

    async fn list_disks(&self, ctx: &CredentialContext, zone: &str) -> ProviderResult<Vec<RawDisk>> {
        let url = self.compute_zonal_url(ctx.project_id(), zone, "disks");
        self.list_all(ctx, &url).await
    }

    async fn list_addresses(
        &self,
        ctx: &CredentialContext,
        region: &str,
    ) -> ProviderResult<Vec<RawAddress>> {
        let url = self.compute_regional_url(ctx.project_id(), region, "addresses");
        self.list_all(ctx, &url).await
    }

    async fn list_global_addresses(
        &self,
        ctx: &CredentialContext,
    ) -> ProviderResult<Vec<RawAddress>> {
        let url = self.compute_global_url(ctx.project_id(), "addresses");
        self.list_all(ctx, &url).await
    }

    async fn list_networks(&self, ctx: &CredentialContext) -> ProviderResult<Vec<RawNetwork>> {
        let url = self.compute_global_url(ctx.project_id(), "networks");
        self.list_all(ctx, &url).await
    }

    async fn list_subnetworks(
        &self,
        ctx: &CredentialContext,
        region: &str,
    ) -> ProviderResult<Vec<RawSubnetwork>> {
        let url = self.compute_regional_url(ctx.project_id(), region, "subnetworks");
        self.list_all(ctx, &url).await
    }

    async fn list_forwarding_rules(
        &self,
        ctx: &CredentialContext,
        region: &str,
    ) -> ProviderResult<Vec<RawForwardingRule>> {
        let url = self.compute_regional_url(ctx.project_id(), region, "forwardingRules");
        self.list_all(ctx, &url).await
    }

    async fn list_global_forwarding_rules(
        &self,
        ctx: &CredentialContext,
    ) -> ProviderResult<Vec<RawForwardingRule>> {
        let url = self.compute_global_url(ctx.project_id(), "forwardingRules");
        self.list_all(ctx, &url).await
    }

    async fn get_billing_info(&self, ctx: &CredentialContext) -> ProviderResult<RawBillingInfo> {
        let url = self.billing_url(&format!(
            "projects/{}/billingInfo",
            urlencoding::encode(ctx.project_id())
        ));
        let response = self.get(ctx, &url).await?;
        decode(response)
    }

    async fn get_billing_account(
        &self,
        ctx: &CredentialContext,
        account_id: &str,
    ) -> ProviderResult<RawBillingAccount> {
        let url = self.billing_url(&format!(
            "billingAccounts/{}",
            urlencoding::encode(account_id)
        ));
        let response = self.get(ctx, &url).await?;
        decode(response)
    }
}
