//! VPC network and load balancer operations

use super::{dedup_by_identity, identity, Listing, Services};
use crate::error::ToolError;
use crate::gcp::auth::CredentialContext;
use crate::models::{
    region_of_url, short_name, LoadBalancer, LoadBalancerType, Scope, SecondaryRange, Subnet,
    VpcNetwork,
};
use crate::provider::{RawForwardingRule, RawNetwork, RawSubnetwork};
use std::collections::HashMap;

/// Networks with their subnets.
///
/// Subnet details are read per region. When a region cannot be read, its
/// subnets keep only name and region and the region is reported as failed.
pub async fn list_vpc_networks_and_subnets(
    svc: &Services,
    ctx: &CredentialContext,
) -> Result<Listing<VpcNetwork>, ToolError> {
    let networks = svc.call("list networks", svc.provider.list_networks(ctx)).await?;

    let mut regions: Vec<Scope> = Vec::new();
    for link in networks.iter().flat_map(|n| n.subnetworks.iter()) {
        if let Some(region) = region_of_url(link) {
            let scope = Scope::Region(region);
            if !regions.contains(&scope) {
                regions.push(scope);
            }
        }
    }

    let Listing { items, failures } = svc
        .fan_out("list subnetworks", regions, move |scope| async move {
            svc.provider.list_subnetworks(ctx, scope.label()).await
        })
        .await;

    let subnets: HashMap<(String, String), RawSubnetwork> = items
        .into_iter()
        .map(|(scope, s)| ((scope.label().to_string(), s.name.clone()), s))
        .collect();

    let items = networks
        .into_iter()
        .map(|network| network_record(network, &subnets))
        .collect();
    Ok(Listing { items, failures })
}

/// Forwarding rules of one region, or global rules followed by every region's
pub async fn list_load_balancers(
    svc: &Services,
    ctx: &CredentialContext,
    region: Option<&str>,
) -> Result<Listing<LoadBalancer>, ToolError> {
    let listing = match region {
        Some(region) => {
            let scope = Scope::Region(region.to_string());
            svc.in_scope(
                "list forwarding rules",
                scope,
                svc.provider.list_forwarding_rules(ctx, region),
            )
            .await?
        },
        None => {
            let mut scopes = vec![Scope::Global];
            scopes.extend(svc.regions(ctx).await?);
            svc.fan_out("list forwarding rules", scopes, move |scope| async move {
                match &scope {
                    Scope::Global => svc.provider.list_global_forwarding_rules(ctx).await,
                    other => svc.provider.list_forwarding_rules(ctx, other.label()).await,
                }
            })
            .await
        },
    };

    let Listing { items, failures } = listing;
    let items = dedup_by_identity(items, |(scope, r)| {
        identity(scope, r.self_link.as_deref(), &r.name)
    });
    Ok(Listing {
        items: items
            .into_iter()
            .map(|(scope, r)| load_balancer_record(&scope, r))
            .collect(),
        failures,
    })
}

fn network_record(network: RawNetwork, details: &HashMap<(String, String), RawSubnetwork>) -> VpcNetwork {
    let subnets = network
        .subnetworks
        .iter()
        .map(|link| {
            let region = region_of_url(link);
            let name = short_name(link);
            let raw = region
                .as_ref()
                .and_then(|region| details.get(&(region.clone(), name.clone())));
            match raw {
                Some(raw) => subnet_record(region, raw),
                None => Subnet {
                    name,
                    id: None,
                    region,
                    network: Some(network.name.clone()),
                    ip_cidr_range: None,
                    gateway_address: None,
                    secondary_ip_ranges: Vec::new(),
                    private_ip_google_access: None,
                    purpose: None,
                    role: None,
                },
            }
        })
        .collect();

    VpcNetwork {
        name: network.name,
        id: network.id,
        auto_create_subnetworks: network.auto_create_subnetworks,
        routing_mode: network.routing_config.and_then(|c| c.routing_mode),
        subnets,
    }
}

fn subnet_record(region: Option<String>, raw: &RawSubnetwork) -> Subnet {
    Subnet {
        name: raw.name.clone(),
        id: raw.id.clone(),
        region,
        network: raw.network.as_deref().map(short_name),
        ip_cidr_range: raw.ip_cidr_range.clone(),
        gateway_address: raw.gateway_address.clone(),
        secondary_ip_ranges: raw
            .secondary_ip_ranges
            .iter()
            .map(|r| SecondaryRange {
                range_name: r.range_name.clone(),
                ip_cidr_range: r.ip_cidr_range.clone(),
            })
            .collect(),
        private_ip_google_access: raw.private_ip_google_access,
        purpose: raw.purpose.clone(),
        role: raw.role.clone(),
    }
}

fn load_balancer_record(scope: &Scope, raw: RawForwardingRule) -> LoadBalancer {
    LoadBalancer {
        name: raw.name,
        scope: scope.kind(),
        region: scope.region(),
        lb_type: LoadBalancerType::from_scheme(raw.load_balancing_scheme.as_deref()),
        ip_address: raw.ip_address,
        ip_protocol: raw.ip_protocol,
        network_tier: raw.network_tier,
        load_balancing_scheme: raw.load_balancing_scheme,
        target: raw.target.as_deref().map(short_name),
        description: raw.description,
    }
}
