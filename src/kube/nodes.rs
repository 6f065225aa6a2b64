// src/kube/nodes.rs

//! Node models deserialized from `kubectl get nodes --output=json`.

use serde::{Deserialize, Serialize};

use crate::kube::pods::Metadata;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeList {
    #[serde(default)]
    pub items: Vec<Node>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Node {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub status: NodeStatus,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeStatus {
    #[serde(default)]
    pub conditions: Vec<NodeCondition>,
    #[serde(default)]
    pub addresses: Vec<NodeAddress>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeCondition {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeAddress {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub address: String,
}

impl NodeCondition {
    /// Whether the reported status is the healthy one. `Ready` is healthy
    /// when true; every other condition (the pressure conditions) signals
    /// trouble when true.
    pub fn healthy(&self) -> bool {
        let expected = if self.kind == "Ready" { "True" } else { "False" };
        self.status == expected
    }

    /// One-cell summary; unhealthy conditions carry their reason (minus the
    /// kubelet boilerplate) and a `!` marker.
    pub fn summary(&self) -> String {
        if self.healthy() {
            return self.kind.clone();
        }
        let reason = self
            .reason
            .trim_start_matches("kubelet has ")
            .trim_start_matches("kubelet is ");
        if reason.is_empty() {
            format!("{}!", self.kind)
        } else {
            format!("{}:{reason}!", self.kind)
        }
    }
}

impl Node {
    pub fn conditions_summary(&self) -> String {
        self.status
            .conditions
            .iter()
            .map(NodeCondition::summary)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Distinct addresses not already part of the node name (external IPs
    /// sort ahead of hostnames and internal IPs).
    pub fn addresses(&self) -> Vec<String> {
        let name = &self.metadata.name;
        let mut addrs: Vec<String> = self
            .status
            .addresses
            .iter()
            .map(|a| a.address.clone())
            .filter(|a| !a.is_empty() && !name.contains(a.as_str()))
            .collect();
        addrs.sort_unstable_by(|a, b| b.cmp(a));
        addrs.dedup();
        addrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_node() -> Node {
        serde_json::from_value(json!({
            "metadata": {"name": "node-a"},
            "status": {
                "conditions": [
                    {"type": "Ready", "status": "True",
                     "reason": "KubeletReady"},
                    {"type": "MemoryPressure", "status": "True",
                     "reason": "kubelet has insufficient memory available"},
                    {"type": "DiskPressure", "status": "False",
                     "reason": "kubelet has no disk pressure"}
                ],
                "addresses": [
                    {"type": "InternalIP", "address": "10.0.0.7"},
                    {"type": "ExternalIP", "address": "203.0.113.9"},
                    {"type": "Hostname", "address": "node-a"}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn ready_true_is_healthy_but_pressure_true_is_not() {
        let node = sample_node();
        assert!(node.status.conditions[0].healthy());
        assert!(!node.status.conditions[1].healthy());
        assert!(node.status.conditions[2].healthy());
    }

    #[test]
    fn unhealthy_conditions_are_marked_with_their_reason() {
        let node = sample_node();
        assert_eq!(
            node.conditions_summary(),
            "Ready MemoryPressure:insufficient memory available! DiskPressure"
        );
    }

    #[test]
    fn addresses_drop_the_node_name_and_empties() {
        let node = sample_node();
        assert_eq!(node.addresses(), vec!["203.0.113.9", "10.0.0.7"]);
    }
}
