//! Domain operations
//!
//! One module per resource family. Operations receive already-validated
//! input and an authenticated [`CredentialContext`]; every provider call goes
//! through [`Services::call`] so it is bounded by the configured timeout.
//!
//! - [`storage`] - Cloud Storage buckets
//! - [`compute`] - instances, persistent disks, reserved IP addresses
//! - [`network`] - VPC networks and subnets, load balancers
//! - [`billing`] - billing cost and monitoring metrics (simplified)

pub mod billing;
pub mod compute;
pub mod network;
pub mod storage;

use crate::envelope::ScopeFailure;
use crate::error::{ProviderResult, ToolError};
use crate::gcp::auth::CredentialContext;
use crate::models::Scope;
use crate::provider::CloudProvider;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Bounds applied to provider calls
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Upper bound for a single provider call
    pub call_timeout: Duration,
    /// Sub-calls in flight at once during a scope fan-out
    pub max_in_flight: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Records gathered from one or more scopes, plus the scopes that failed
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub failures: Vec<ScopeFailure>,
}

impl<T> Listing<T> {
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            failures: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            failures: self.failures,
        }
    }
}

/// Shared handles every domain operation needs
#[derive(Clone)]
pub struct Services {
    pub provider: Arc<dyn CloudProvider>,
    pub limits: Limits,
}

impl Services {
    pub fn new(provider: Arc<dyn CloudProvider>, limits: Limits) -> Self {
        Self { provider, limits }
    }

    /// Run one provider call under the call timeout
    pub async fn call<T, F>(&self, what: &str, fut: F) -> Result<T, ToolError>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        match tokio::time::timeout(self.limits.call_timeout, fut).await {
            Ok(result) => result.map_err(ToolError::from),
            Err(_) => Err(ToolError::Upstream(format!(
                "{} timed out after {}s",
                what,
                self.limits.call_timeout.as_secs_f64()
            ))),
        }
    }

    pub async fn zones(&self, ctx: &CredentialContext) -> Result<Vec<Scope>, ToolError> {
        let zones = self.call("list zones", self.provider.list_zones(ctx)).await?;
        Ok(zones.into_iter().map(Scope::Zone).collect())
    }

    pub async fn regions(&self, ctx: &CredentialContext) -> Result<Vec<Scope>, ToolError> {
        let regions = self.call("list regions", self.provider.list_regions(ctx)).await?;
        Ok(regions.into_iter().map(Scope::Region).collect())
    }

    /// Records of one explicitly requested scope; failures propagate
    pub async fn in_scope<R, Fut>(&self, what: &str, scope: Scope, fut: Fut) -> Result<Listing<(Scope, R)>, ToolError>
    where
        Fut: Future<Output = ProviderResult<Vec<R>>>,
    {
        let records = self.call(what, fut).await?;
        Ok(Listing::complete(
            records.into_iter().map(|r| (scope.clone(), r)).collect(),
        ))
    }

    /// Query every scope with at most `max_in_flight` calls outstanding.
    ///
    /// Results come back in scope order, each scope's records in provider
    /// order. A failing scope is recorded and skipped; it never aborts the
    /// other scopes.
    pub async fn fan_out<R, F, Fut>(&self, what: &str, scopes: Vec<Scope>, fetch: F) -> Listing<(Scope, R)>
    where
        F: Fn(Scope) -> Fut,
        Fut: Future<Output = ProviderResult<Vec<R>>>,
    {
        let results: Vec<(Scope, Result<Vec<R>, ToolError>)> = stream::iter(scopes)
            .map(|scope| {
                let fut = fetch(scope.clone());
                async move {
                    let what = format!("{} in {}", what, scope.label());
                    let result = self.call(&what, fut).await;
                    (scope, result)
                }
            })
            .buffered(self.limits.max_in_flight.max(1))
            .collect()
            .await;

        let mut listing = Listing::complete(Vec::new());
        for (scope, result) in results {
            match result {
                Ok(records) => listing
                    .items
                    .extend(records.into_iter().map(|r| (scope.clone(), r))),
                Err(e) => {
                    tracing::warn!("{} failed in {}: {}", what, scope.label(), e);
                    listing.failures.push(ScopeFailure::new(scope.label(), &e));
                },
            }
        }
        listing
    }
}

/// Keep the first occurrence of every identity, preserving order
pub fn dedup_by_identity<T>(items: Vec<T>, identity: impl Fn(&T) -> String) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(identity(item)))
        .collect()
}

/// Resource identity: the self link when the provider reports one,
/// otherwise scope and name
pub fn identity(scope: &Scope, self_link: Option<&str>, name: &str) -> String {
    match self_link {
        Some(link) if !link.is_empty() => link.to_string(),
        _ => format!("{}/{}", scope.label(), name),
    }
}
