//! Tool catalog
//!
//! One typed request per tool. Each request carries its argument schema and
//! knows which domain operation to run; the registry deserializes the
//! validated argument object into the request and calls [`ToolRequest::execute`].

use crate::envelope::ToolOutput;
use crate::error::{ToolError, ValidationError};
use crate::gcp::auth::CredentialContext;
use crate::models::{Aggregation, BillingGroup, StorageClass, TimeRange};
use crate::ops::billing::{CostQuery, MetricsQuery};
use crate::ops::compute::InstanceTemplate;
use crate::ops::{billing, compute, network, storage, Listing, Services};
use crate::provider::NewBucket;
use crate::validate::{ArgSchema, FieldDefault, FieldKind, FieldSpec, TextRule};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A typed tool request bound to its domain operation
#[async_trait]
pub trait ToolRequest: DeserializeOwned + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    const SCHEMA: ArgSchema;

    /// Project the credentials are resolved for
    fn project_id(&self) -> &str;

    /// Cross-field checks the schema cannot express; runs before credentials
    /// are resolved
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    async fn execute(self, svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError>;
}

// =============================================================================
// Shared fields
// =============================================================================

const PROJECT_ID: FieldSpec = FieldSpec::required(
    "project_id",
    FieldKind::Text(TextRule::ProjectId),
    "GCP project ID",
);
const ZONE: FieldSpec = FieldSpec::required(
    "zone",
    FieldKind::Text(TextRule::Location),
    "Zone, e.g. us-central1-a",
);
const ANY_ZONE: FieldSpec = FieldSpec::optional(
    "zone",
    FieldKind::Text(TextRule::Location),
    "Zone to query; every zone of the project when omitted",
);
const ANY_REGION: FieldSpec = FieldSpec::optional(
    "region",
    FieldKind::Text(TextRule::Location),
    "Region to query; global resources and every region when omitted",
);
const BUCKET_NAME: FieldSpec = FieldSpec::required(
    "bucket_name",
    FieldKind::Text(TextRule::BucketName),
    "Bucket name",
);
const INSTANCE_NAME: FieldSpec = FieldSpec::required(
    "instance_name",
    FieldKind::Text(TextRule::ResourceName),
    "Instance name",
);

fn listing_output<T: Serialize>(key: &str, listing: Listing<T>) -> Result<ToolOutput, ToolError> {
    Ok(ToolOutput::new()
        .with(key, &listing.items)?
        .with_failures(listing.failures))
}

// =============================================================================
// Storage
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ListBuckets {
    pub project_id: String,
}

#[async_trait]
impl ToolRequest for ListBuckets {
    const NAME: &'static str = "list_buckets";
    const DESCRIPTION: &'static str = "List all storage buckets in a project";
    const SCHEMA: ArgSchema = ArgSchema {
        fields: &[PROJECT_ID],
    };

    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn execute(self, svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError> {
        let buckets = storage::list_buckets(svc, ctx).await?;
        ToolOutput::new().with("buckets", &buckets)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBucket {
    pub project_id: String,
    pub bucket_name: String,
    pub location: String,
    pub storage_class: StorageClass,
    pub versioning: bool,
}

#[async_trait]
impl ToolRequest for CreateBucket {
    const NAME: &'static str = "create_bucket";
    const DESCRIPTION: &'static str = "Create a new storage bucket";
    const SCHEMA: ArgSchema = ArgSchema {
        fields: &[
            PROJECT_ID,
            BUCKET_NAME,
            FieldSpec::required(
                "location",
                FieldKind::Text(TextRule::Location),
                "Bucket location, e.g. US or us-east1",
            ),
            FieldSpec::optional(
                "storage_class",
                FieldKind::Choice(StorageClass::NAMES),
                "Storage class",
            )
            .with_default(FieldDefault::Text("STANDARD")),
            FieldSpec::optional("versioning", FieldKind::Boolean, "Enable object versioning")
                .with_default(FieldDefault::Boolean(false)),
        ],
    };

    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn execute(self, svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError> {
        let bucket = NewBucket {
            name: self.bucket_name,
            location: self.location,
            storage_class: self.storage_class,
            versioning: self.versioning,
        };
        let message = storage::create_bucket(svc, ctx, &bucket).await?;
        Ok(ToolOutput::message(message))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteBucket {
    pub project_id: String,
    pub bucket_name: String,
}

#[async_trait]
impl ToolRequest for DeleteBucket {
    const NAME: &'static str = "delete_bucket";
    const DESCRIPTION: &'static str = "Delete a storage bucket";
    const SCHEMA: ArgSchema = ArgSchema {
        fields: &[PROJECT_ID, BUCKET_NAME],
    };

    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn execute(self, svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError> {
        let message = storage::delete_bucket(svc, ctx, &self.bucket_name).await?;
        Ok(ToolOutput::message(message))
    }
}

// =============================================================================
// Compute
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ListInstances {
    pub project_id: String,
    pub zone: Option<String>,
}

#[async_trait]
impl ToolRequest for ListInstances {
    const NAME: &'static str = "list_instances";
    const DESCRIPTION: &'static str = "List compute instances in a zone or across all zones";
    const SCHEMA: ArgSchema = ArgSchema {
        fields: &[PROJECT_ID, ANY_ZONE],
    };

    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn execute(self, svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError> {
        let listing = compute::list_instances(svc, ctx, self.zone.as_deref()).await?;
        listing_output("instances", listing)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListPersistentDisks {
    pub project_id: String,
    pub zone: Option<String>,
}

#[async_trait]
impl ToolRequest for ListPersistentDisks {
    const NAME: &'static str = "list_persistent_disks";
    const DESCRIPTION: &'static str =
        "List persistent disks with their attachments in a zone or across all zones";
    const SCHEMA: ArgSchema = ArgSchema {
        fields: &[PROJECT_ID, ANY_ZONE],
    };

    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn execute(self, svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError> {
        let listing = compute::list_persistent_disks(svc, ctx, self.zone.as_deref()).await?;
        listing_output("disks", listing)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListIpAddresses {
    pub project_id: String,
    pub region: Option<String>,
}

#[async_trait]
impl ToolRequest for ListIpAddresses {
    const NAME: &'static str = "list_ip_addresses";
    const DESCRIPTION: &'static str = "List reserved IP addresses and their usage";
    const SCHEMA: ArgSchema = ArgSchema {
        fields: &[PROJECT_ID, ANY_REGION],
    };

    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn execute(self, svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError> {
        let listing = compute::list_ip_addresses(svc, ctx, self.region.as_deref()).await?;
        listing_output("addresses", listing)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteInstance {
    pub project_id: String,
    pub zone: String,
    pub instance_name: String,
}

#[async_trait]
impl ToolRequest for DeleteInstance {
    const NAME: &'static str = "delete_instance";
    const DESCRIPTION: &'static str = "Delete a compute instance";
    const SCHEMA: ArgSchema = ArgSchema {
        fields: &[PROJECT_ID, ZONE, INSTANCE_NAME],
    };

    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn execute(self, svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError> {
        let message = compute::delete_instance(svc, ctx, &self.zone, &self.instance_name).await?;
        Ok(ToolOutput::message(message))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInstance {
    pub project_id: String,
    pub zone: String,
    pub instance_name: String,
    pub machine_type: String,
    pub image_family: String,
    pub disk_size_gb: u64,
    pub network: String,
    pub subnetwork: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub service_account: Option<String>,
}

#[async_trait]
impl ToolRequest for CreateInstance {
    const NAME: &'static str = "create_instance";
    const DESCRIPTION: &'static str =
        "Request a new compute instance (placeholder: validates and checks for conflicts only)";
    const SCHEMA: ArgSchema = ArgSchema {
        fields: &[
            PROJECT_ID,
            ZONE,
            INSTANCE_NAME,
            FieldSpec::required(
                "machine_type",
                FieldKind::Text(TextRule::ResourceName),
                "Machine type, e.g. e2-medium",
            ),
            FieldSpec::required(
                "image_family",
                FieldKind::Text(TextRule::ResourceName),
                "Image family, e.g. debian-12",
            ),
            FieldSpec::optional(
                "disk_size_gb",
                FieldKind::Integer { min: 10, max: 65536 },
                "Boot disk size in GB",
            )
            .with_default(FieldDefault::Integer(10)),
            FieldSpec::optional("network", FieldKind::Text(TextRule::ResourceName), "Network name")
                .with_default(FieldDefault::Text("default")),
            FieldSpec::optional(
                "subnetwork",
                FieldKind::Text(TextRule::ResourceName),
                "Subnetwork name",
            ),
            FieldSpec::optional(
                "tags",
                FieldKind::TextList(TextRule::ResourceName),
                "Network tags",
            )
            .with_default(FieldDefault::List(&[])),
            FieldSpec::optional(
                "service_account",
                FieldKind::Text(TextRule::Email),
                "Service account email",
            ),
        ],
    };

    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn execute(self, svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError> {
        let template = InstanceTemplate {
            zone: self.zone,
            name: self.instance_name,
            machine_type: self.machine_type,
            image_family: self.image_family,
            disk_size_gb: self.disk_size_gb,
            network: self.network,
            subnetwork: self.subnetwork,
            tags: self.tags,
            service_account: self.service_account,
        };
        let message = compute::create_instance(svc, ctx, &template).await?;
        Ok(ToolOutput::message(message))
    }
}

// =============================================================================
// Network
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ListVpcNetworksAndSubnets {
    pub project_id: String,
}

#[async_trait]
impl ToolRequest for ListVpcNetworksAndSubnets {
    const NAME: &'static str = "list_vpc_networks_and_subnets";
    const DESCRIPTION: &'static str = "List VPC networks with their subnets";
    const SCHEMA: ArgSchema = ArgSchema {
        fields: &[PROJECT_ID],
    };

    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn execute(self, svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError> {
        let listing = network::list_vpc_networks_and_subnets(svc, ctx).await?;
        listing_output("networks", listing)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListLoadBalancers {
    pub project_id: String,
    pub region: Option<String>,
}

#[async_trait]
impl ToolRequest for ListLoadBalancers {
    const NAME: &'static str = "list_load_balancers";
    const DESCRIPTION: &'static str = "List load balancers (forwarding rules), global and regional";
    const SCHEMA: ArgSchema = ArgSchema {
        fields: &[PROJECT_ID, ANY_REGION],
    };

    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn execute(self, svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError> {
        let listing = network::list_load_balancers(svc, ctx, self.region.as_deref()).await?;
        listing_output("load_balancers", listing)
    }
}

// =============================================================================
// Billing / Monitoring
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GetBillingCost {
    pub project_id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub group_by: Vec<BillingGroup>,
}

impl GetBillingCost {
    fn time_range(&self) -> Result<TimeRange, ValidationError> {
        billing::time_range(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            Utc::now().date_naive(),
        )
    }
}

#[async_trait]
impl ToolRequest for GetBillingCost {
    const NAME: &'static str = "get_billing_cost";
    const DESCRIPTION: &'static str =
        "Get billing cost for a project through its linked billing account (simplified)";
    const SCHEMA: ArgSchema = ArgSchema {
        fields: &[
            PROJECT_ID,
            FieldSpec::optional(
                "start_date",
                FieldKind::Text(TextRule::Date),
                "Start date (YYYY-MM-DD); 30 days before end_date when omitted",
            ),
            FieldSpec::optional(
                "end_date",
                FieldKind::Text(TextRule::Date),
                "End date (YYYY-MM-DD); today when omitted",
            ),
            FieldSpec::optional(
                "group_by",
                FieldKind::ChoiceList(BillingGroup::NAMES),
                "Fields to group costs by",
            )
            .with_default(FieldDefault::List(&["service"])),
        ],
    };

    fn project_id(&self) -> &str {
        &self.project_id
    }

    fn check(&self) -> Result<(), ValidationError> {
        self.time_range().map(|_| ())
    }

    async fn execute(self, svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError> {
        let query = CostQuery {
            time_range: self.time_range()?,
            group_by: self.group_by,
        };
        let cost = billing::get_billing_cost(svc, ctx, &query).await?;
        ToolOutput::from_record(&cost)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetMetrics {
    pub project_id: String,
    pub metric_type: String,
    pub interval: String,
    pub aggregation: Aggregation,
}

#[async_trait]
impl ToolRequest for GetMetrics {
    const NAME: &'static str = "get_metrics";
    const DESCRIPTION: &'static str = "Get monitoring metrics (placeholder: returns an empty series)";
    const SCHEMA: ArgSchema = ArgSchema {
        fields: &[
            PROJECT_ID,
            FieldSpec::required(
                "metric_type",
                FieldKind::Text(TextRule::MetricType),
                "Metric type, e.g. compute.googleapis.com/instance/cpu/utilization",
            ),
            FieldSpec::optional("interval", FieldKind::Text(TextRule::Interval), "Time window, e.g. 1h")
                .with_default(FieldDefault::Text("1h")),
            FieldSpec::optional(
                "aggregation",
                FieldKind::Choice(Aggregation::NAMES),
                "Aggregation method",
            )
            .with_default(FieldDefault::Text("mean")),
        ],
    };

    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn execute(self, _svc: &Services, ctx: &CredentialContext) -> Result<ToolOutput, ToolError> {
        let query = MetricsQuery {
            metric_type: self.metric_type,
            interval: self.interval,
            aggregation: self.aggregation,
        };
        let metrics = billing::get_metrics(ctx, &query)?;
        ToolOutput::from_record(&metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse<R: ToolRequest>(args: serde_json::Value) -> R {
        let map = R::SCHEMA.validate(&args).unwrap();
        serde_json::from_value(serde_json::Value::Object(map)).unwrap()
    }

    #[test]
    fn test_create_bucket_defaults() {
        let req: CreateBucket = parse(json!({
            "project_id": "p1",
            "bucket_name": "logs-archive",
            "location": "US"
        }));
        assert_eq!(req.storage_class, StorageClass::Standard);
        assert!(!req.versioning);
    }

    #[test]
    fn test_create_bucket_coerces_loose_values() {
        let req: CreateBucket = parse(json!({
            "project_id": "p1",
            "bucket_name": "logs-archive",
            "location": "US",
            "storage_class": "coldline",
            "versioning": "true"
        }));
        assert_eq!(req.storage_class, StorageClass::Coldline);
        assert!(req.versioning);
    }

    #[test]
    fn test_create_instance_defaults() {
        let req: CreateInstance = parse(json!({
            "project_id": "p1",
            "zone": "us-central1-a",
            "instance_name": "web-1",
            "machine_type": "e2-medium",
            "image_family": "debian-12"
        }));
        assert_eq!(req.disk_size_gb, 10);
        assert_eq!(req.network, "default");
        assert!(req.tags.is_empty());
        assert!(req.subnetwork.is_none());
    }

    #[test]
    fn test_create_instance_rejects_tiny_disk() {
        let err = CreateInstance::SCHEMA
            .validate(&json!({
                "project_id": "p1",
                "zone": "us-central1-a",
                "instance_name": "web-1",
                "machine_type": "e2-medium",
                "image_family": "debian-12",
                "disk_size_gb": 5
            }))
            .unwrap_err();
        assert_eq!(err.field, "disk_size_gb");
    }

    #[test]
    fn test_billing_group_by_defaults_to_service() {
        let req: GetBillingCost = parse(json!({ "project_id": "p1" }));
        assert_eq!(req.group_by, vec![BillingGroup::Service]);
        assert!(req.start_date.is_none());
    }

    #[test]
    fn test_inverted_billing_window_fails_check() {
        let req: GetBillingCost = parse(json!({
            "project_id": "p1",
            "start_date": "2024-02-01",
            "end_date": "2024-01-01"
        }));
        assert_eq!(req.check().unwrap_err().field, "start_date");

        let ok: GetBillingCost = parse(json!({ "project_id": "p1", "end_date": "2024-01-31" }));
        assert!(ok.check().is_ok());
    }

    #[test]
    fn test_metrics_defaults() {
        let req: GetMetrics = parse(json!({
            "project_id": "p1",
            "metric_type": "compute.googleapis.com/instance/cpu/utilization"
        }));
        assert_eq!(req.interval, "1h");
        assert_eq!(req.aggregation, Aggregation::Mean);
    }

    #[test]
    fn test_unknown_storage_class_rejected() {
        let err = CreateBucket::SCHEMA
            .validate(&json!({
                "project_id": "p1",
                "bucket_name": "logs-archive",
                "location": "US",
                "storage_class": "GLACIER"
            }))
            .unwrap_err();
        assert_eq!(err.field, "storage_class");
    }
}
