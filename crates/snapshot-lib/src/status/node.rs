//! Node roles and readiness

use k8s_openapi::api::core::v1::Node;
use std::collections::BTreeSet;

/// Label prefix marking node roles, e.g. `node-role.kubernetes.io/control-plane`
pub const LABEL_NODE_ROLE_PREFIX: &str = "node-role.kubernetes.io/";

/// Derived node state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState {
    /// Sorted, deduplicated role names
    pub roles: Vec<String>,
    /// `Ready`, `NotReady` or `Unknown`, optionally followed by `,SchedulingDisabled`
    pub status: String,
}

/// Derive roles and the combined status string for a node
pub fn resolve_node(node: &Node) -> NodeState {
    let roles: BTreeSet<String> = node
        .metadata
        .labels
        .iter()
        .flatten()
        .filter_map(|(key, _)| key.strip_prefix(LABEL_NODE_ROLE_PREFIX))
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect();

    let readiness = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"))
        .map(|c| if c.status == "True" { "Ready" } else { "NotReady" })
        .unwrap_or("Unknown");

    let unschedulable = node
        .spec
        .as_ref()
        .and_then(|s| s.unschedulable)
        .unwrap_or(false);

    let status = if unschedulable {
        format!("{readiness},SchedulingDisabled")
    } else {
        readiness.to_string()
    };

    NodeState {
        roles: roles.into_iter().collect(),
        status,
    }
}
