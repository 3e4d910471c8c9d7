//! Coverage of the VMware Cloud Director provider
//!
//! Maps `vcd_*` resource types to their Cloud Avenue counterpart and lists the
//! types that have no meaning on Cloud Avenue, where tenants never administer
//! the platform itself.

use std::collections::HashMap;
use std::sync::OnceLock;

const EQUIVALENTS: &[(&str, &str)] = &[
    ("vcd_edgegateway", "cloudavenue_edgegateway"),
    ("vcd_nsxt_edgegateway", "cloudavenue_edgegateway"),
    ("vcd_org_vdc", "cloudavenue_vdc"),
    ("vcd_vdc_group", "cloudavenue_vdc_group"),
    ("vcd_catalog", "cloudavenue_catalog"),
    ("vcd_catalog_item", "cloudavenue_catalog_vapp_template"),
    ("vcd_catalog_media", "cloudavenue_catalog_media"),
    ("vcd_catalog_vapp_template", "cloudavenue_catalog_vapp_template"),
    ("vcd_vapp", "cloudavenue_vapp"),
    ("vcd_vapp_vm", "cloudavenue_vm"),
    ("vcd_vm", "cloudavenue_vm"),
    ("vcd_vm_internal_disk", "cloudavenue_vm_disk"),
    ("vcd_independent_disk", "cloudavenue_vm_disk"),
    ("vcd_network_routed_v2", "cloudavenue_network_routed"),
    ("vcd_network_isolated_v2", "cloudavenue_network_isolated"),
    ("vcd_vapp_org_network", "cloudavenue_vapp_org_network"),
    ("vcd_vapp_network", "cloudavenue_vapp_isolated_network"),
    ("vcd_nsxt_ip_set", "cloudavenue_edgegateway_ip_set"),
    ("vcd_nsxt_firewall", "cloudavenue_edgegateway_firewall"),
    ("vcd_nsxt_app_port_profile", "cloudavenue_edgegateway_app_port_profile"),
    ("vcd_nsxt_security_group", "cloudavenue_edgegateway_security_group"),
    ("vcd_nsxt_nat_rule", "cloudavenue_edgegateway_nat_rule"),
    ("vcd_nsxt_ipsec_vpn_tunnel", "cloudavenue_edgegateway_vpn_ipsec"),
    ("vcd_org_user", "cloudavenue_iam_user"),
    ("vcd_org_group", "cloudavenue_iam_group"),
    ("vcd_role", "cloudavenue_iam_role"),
    ("vcd_external_network_v2", "cloudavenue_publicip"),
];

const NOT_APPLICABLE: &[&str] = &[
    "vcd_org",
    "vcd_org_ldap",
    "vcd_org_saml",
    "vcd_external_network",
    "vcd_provider_vdc",
    "vcd_vm_sizing_policy",
    "vcd_vm_placement_policy",
    "vcd_global_role",
    "vcd_rights_bundle",
    "vcd_nsxt_tier0_router_interface",
    "vcd_nsxt_edge_cluster",
    "vcd_vcenter",
    "vcd_ip_space",
    "vcd_library_certificate",
    "vcd_api_token",
    "vcd_service_account",
];

fn equivalents() -> &'static HashMap<&'static str, &'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| EQUIVALENTS.iter().copied().collect())
}

/// How an upstream resource type is covered by this provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Covered by the named Cloud Avenue resource
    Equivalent(&'static str),
    /// Deliberately excluded
    NotApplicable,
    Missing,
}

pub fn coverage_of(vcd_resource: &str) -> Coverage {
    if let Some(name) = equivalents().get(vcd_resource) {
        return Coverage::Equivalent(*name);
    }
    if NOT_APPLICABLE.iter().any(|name| *name == vcd_resource) {
        return Coverage::NotApplicable;
    }
    Coverage::Missing
}

/// Upstream resource types covered by `cloudavenue_resource`, sorted
pub fn equivalents_of(cloudavenue_resource: &str) -> Vec<&'static str> {
    let mut names: Vec<_> = equivalents()
        .iter()
        .filter(|(_, target)| **target == cloudavenue_resource)
        .map(|(vcd, _)| *vcd)
        .collect();
    names.sort_unstable();
    names
}
