//! Cloud Storage bucket operations

use super::Services;
use crate::error::ToolError;
use crate::gcp::auth::CredentialContext;
use crate::provider::NewBucket;

/// Bucket names in provider order
pub async fn list_buckets(svc: &Services, ctx: &CredentialContext) -> Result<Vec<String>, ToolError> {
    let buckets = svc.call("list buckets", svc.provider.list_buckets(ctx)).await?;
    Ok(buckets.into_iter().map(|b| b.name).collect())
}

/// Create a bucket with its storage class and versioning set in one insert
pub async fn create_bucket(
    svc: &Services,
    ctx: &CredentialContext,
    bucket: &NewBucket,
) -> Result<String, ToolError> {
    tracing::info!(
        "Creating bucket {} in {} ({}, versioning={})",
        bucket.name,
        bucket.location,
        bucket.storage_class.as_str(),
        bucket.versioning
    );

    let created = svc
        .call("create bucket", svc.provider.create_bucket(ctx, bucket))
        .await
        .map_err(|e| match e {
            ToolError::Conflict(_) => {
                ToolError::Conflict(format!("bucket '{}' already exists", bucket.name))
            },
            other => other,
        })?;

    let name = if created.name.is_empty() {
        bucket.name.as_str()
    } else {
        created.name.as_str()
    };
    Ok(format!(
        "Bucket {} created successfully in {}",
        name, bucket.location
    ))
}

pub async fn delete_bucket(
    svc: &Services,
    ctx: &CredentialContext,
    name: &str,
) -> Result<String, ToolError> {
    tracing::info!("Deleting bucket {}", name);

    svc.call("delete bucket", svc.provider.delete_bucket(ctx, name))
        .await
        .map_err(|e| match e {
            ToolError::NotFound(_) => ToolError::NotFound(format!("bucket '{}' does not exist", name)),
            other => other,
        })?;

    Ok(format!("Bucket {} deleted successfully", name))
}
