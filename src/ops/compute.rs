//! Compute Engine operations: instances, persistent disks, reserved addresses

use super::{dedup_by_identity, identity, Listing, Services};
use crate::error::ToolError;
use crate::gcp::auth::CredentialContext;
use crate::models::{
    region_of_zone, short_name, AddressType, AttachedInstance, IpAddress, PersistentDisk, Scope,
};
use crate::provider::{RawAddress, RawDisk};

/// Instance creation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceTemplate {
    pub zone: String,
    pub name: String,
    pub machine_type: String,
    pub image_family: String,
    pub disk_size_gb: u64,
    pub network: String,
    pub subnetwork: Option<String>,
    pub tags: Vec<String>,
    pub service_account: Option<String>,
}

/// Instance names of one zone, or of every zone when `zone` is `None`
pub async fn list_instances(
    svc: &Services,
    ctx: &CredentialContext,
    zone: Option<&str>,
) -> Result<Listing<String>, ToolError> {
    let listing = match zone {
        Some(zone) => {
            let scope = Scope::Zone(zone.to_string());
            svc.in_scope("list instances", scope, svc.provider.list_instances(ctx, zone))
                .await?
        },
        None => {
            let zones = svc.zones(ctx).await?;
            svc.fan_out("list instances", zones, move |scope| async move {
                svc.provider.list_instances(ctx, scope.label()).await
            })
            .await
        },
    };

    let Listing { items, failures } = listing;
    let items = dedup_by_identity(items, |(scope, i)| {
        identity(scope, i.self_link.as_deref(), &i.name)
    });
    Ok(Listing {
        items: items.into_iter().map(|(_, i)| i.name).collect(),
        failures,
    })
}

pub async fn delete_instance(
    svc: &Services,
    ctx: &CredentialContext,
    zone: &str,
    name: &str,
) -> Result<String, ToolError> {
    tracing::info!("Deleting instance {} in {}", name, zone);

    svc.call("delete instance", svc.provider.delete_instance(ctx, zone, name))
        .await
        .map_err(|e| match e {
            ToolError::NotFound(_) => ToolError::NotFound(format!(
                "instance '{}' does not exist in zone '{}'",
                name, zone
            )),
            other => other,
        })?;

    Ok(format!("Instance {} deletion initiated", name))
}

/// Placeholder: checks for a name collision in the zone but does not
/// create anything.
pub async fn create_instance(
    svc: &Services,
    ctx: &CredentialContext,
    template: &InstanceTemplate,
) -> Result<String, ToolError> {
    let existing = svc
        .call(
            "list instances",
            svc.provider.list_instances(ctx, &template.zone),
        )
        .await?;
    if existing.iter().any(|i| i.name == template.name) {
        return Err(ToolError::Conflict(format!(
            "instance '{}' already exists in zone '{}'",
            template.name, template.zone
        )));
    }

    tracing::info!(
        "Instance {} requested in {}: {} from {}, {}GB boot disk, network {}",
        template.name,
        template.zone,
        template.machine_type,
        template.image_family,
        template.disk_size_gb,
        template.network
    );

    Ok(format!(
        "Instance {} creation initiated in {}",
        template.name, template.zone
    ))
}

pub async fn list_persistent_disks(
    svc: &Services,
    ctx: &CredentialContext,
    zone: Option<&str>,
) -> Result<Listing<PersistentDisk>, ToolError> {
    let listing = match zone {
        Some(zone) => {
            let scope = Scope::Zone(zone.to_string());
            svc.in_scope("list disks", scope, svc.provider.list_disks(ctx, zone))
                .await?
        },
        None => {
            let zones = svc.zones(ctx).await?;
            svc.fan_out("list disks", zones, move |scope| async move {
                svc.provider.list_disks(ctx, scope.label()).await
            })
            .await
        },
    };

    let Listing { items, failures } = listing;
    let items = dedup_by_identity(items, |(scope, d)| {
        identity(scope, d.self_link.as_deref(), &d.name)
    });
    Ok(Listing {
        items: items
            .into_iter()
            .map(|(scope, d)| disk_record(scope.label(), d))
            .collect(),
        failures,
    })
}

/// Reserved addresses of one region, or global addresses followed by every
/// region's addresses
pub async fn list_ip_addresses(
    svc: &Services,
    ctx: &CredentialContext,
    region: Option<&str>,
) -> Result<Listing<IpAddress>, ToolError> {
    let listing = match region {
        Some(region) => {
            let scope = Scope::Region(region.to_string());
            svc.in_scope("list addresses", scope, svc.provider.list_addresses(ctx, region))
                .await?
        },
        None => {
            let mut scopes = vec![Scope::Global];
            scopes.extend(svc.regions(ctx).await?);
            svc.fan_out("list addresses", scopes, move |scope| async move {
                match &scope {
                    Scope::Global => svc.provider.list_global_addresses(ctx).await,
                    other => svc.provider.list_addresses(ctx, other.label()).await,
                }
            })
            .await
        },
    };

    let Listing { items, failures } = listing;
    let items = dedup_by_identity(items, |(scope, a)| {
        identity(scope, a.self_link.as_deref(), &a.name)
    });
    Ok(Listing {
        items: items
            .into_iter()
            .map(|(scope, a)| address_record(&scope, a))
            .collect(),
        failures,
    })
}

fn disk_record(zone: &str, raw: RawDisk) -> PersistentDisk {
    let attached_to = raw
        .users
        .iter()
        .filter(|user| user.contains("/instances/"))
        .map(|user| AttachedInstance {
            name: short_name(user),
            status: "ATTACHED".to_string(),
        })
        .collect();

    PersistentDisk {
        name: raw.name,
        id: raw.id,
        size_gb: raw.size_gb.as_deref().and_then(|s| s.parse().ok()),
        status: raw.status,
        disk_type: raw.disk_type.as_deref().map(short_name),
        zone: zone.to_string(),
        region: region_of_zone(zone),
        in_use: !raw.users.is_empty(),
        attached_to,
        creation_timestamp: raw.creation_timestamp,
        physical_block_size_bytes: raw
            .physical_block_size_bytes
            .as_deref()
            .and_then(|s| s.parse().ok()),
        source_image: raw.source_image.as_deref().map(short_name),
        source_snapshot: raw.source_snapshot.as_deref().map(short_name),
        source_disk: raw.source_disk.as_deref().map(short_name),
        labels: raw.labels,
    }
}

fn address_record(scope: &Scope, raw: RawAddress) -> IpAddress {
    IpAddress {
        name: raw.name,
        address: raw.address,
        scope: scope.kind(),
        region: scope.region(),
        status: raw.status,
        in_use: !raw.users.is_empty(),
        address_type: AddressType::from_provider(raw.address_type.as_deref()),
        network: raw.network.as_deref().map(short_name),
        subnet: raw.subnetwork.as_deref().map(short_name),
        used_by: raw.users,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScopeKind;

    #[test]
    fn test_disk_record_shapes_provider_disk() {
        let raw = RawDisk {
            name: "data-1".into(),
            id: Some("123".into()),
            size_gb: Some("200".into()),
            status: Some("READY".into()),
            disk_type: Some("https://x/projects/p/zones/us-east1-b/diskTypes/pd-ssd".into()),
            physical_block_size_bytes: Some("4096".into()),
            source_image: Some("https://x/projects/debian-cloud/global/images/debian-12".into()),
            users: vec!["https://x/projects/p/zones/us-east1-b/instances/web-1".into()],
            ..Default::default()
        };

        let disk = disk_record("us-east1-b", raw);
        assert_eq!(disk.size_gb, Some(200));
        assert_eq!(disk.disk_type.as_deref(), Some("pd-ssd"));
        assert_eq!(disk.region, "us-east1");
        assert!(disk.in_use);
        assert_eq!(disk.attached_to[0].name, "web-1");
        assert_eq!(disk.physical_block_size_bytes, Some(4096));
        assert_eq!(disk.source_image.as_deref(), Some("debian-12"));
        assert!(disk.source_snapshot.is_none());
    }

    #[test]
    fn test_unattached_disk_is_not_in_use() {
        let disk = disk_record("us-east1-b", RawDisk {
            name: "spare".into(),
            size_gb: Some("not-a-number".into()),
            ..Default::default()
        });
        assert!(!disk.in_use);
        assert!(disk.attached_to.is_empty());
        assert_eq!(disk.size_gb, None);
    }

    #[test]
    fn test_global_address_has_null_region() {
        let addr = address_record(&Scope::Global, RawAddress {
            name: "lb-ip".into(),
            address: Some("34.1.2.3".into()),
            ..Default::default()
        });
        assert_eq!(addr.scope, ScopeKind::Global);
        assert_eq!(addr.region, None);
        assert_eq!(addr.address_type, None);
        assert!(!addr.in_use);
    }

    #[test]
    fn test_unset_address_type_serializes_as_null() {
        let raw = |kind: Option<&str>| RawAddress {
            name: "ip".into(),
            address_type: kind.map(String::from),
            ..Default::default()
        };
        let unset = address_record(&Scope::Global, raw(None));
        assert_eq!(serde_json::to_value(&unset).unwrap()["type"], serde_json::Value::Null);

        let odd = address_record(&Scope::Global, raw(Some("IPV6_ONLY")));
        assert_eq!(odd.address_type, None);

        let external = address_record(&Scope::Global, raw(Some("EXTERNAL")));
        assert_eq!(serde_json::to_value(&external).unwrap()["type"], "EXTERNAL");
    }

    #[test]
    fn test_regional_address_keeps_region_and_users() {
        let addr = address_record(&Scope::Region("us-east1".into()), RawAddress {
            name: "nat-ip".into(),
            address_type: Some("INTERNAL".into()),
            subnetwork: Some("https://x/regions/us-east1/subnetworks/app".into()),
            users: vec!["https://x/instances/vm-1".into()],
            ..Default::default()
        });
        assert_eq!(addr.region.as_deref(), Some("us-east1"));
        assert_eq!(addr.address_type, Some(AddressType::Internal));
        assert_eq!(addr.subnet.as_deref(), Some("app"));
        assert!(addr.in_use);
        assert_eq!(addr.used_by.len(), 1);
    }
}
