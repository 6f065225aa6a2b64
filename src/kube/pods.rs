// src/kube/pods.rs

//! Pod models deserialized from `kubectl get pods --output=json`, and the
//! fixed allow-list of listable columns.

use std::fmt;
use std::str::FromStr;

use anyhow::{Error, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PodList {
    #[serde(default)]
    pub items: Vec<Pod>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Pod {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PodSpec {
    #[serde(default, rename = "nodeName")]
    pub node_name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PodStatus {
    #[serde(default)]
    pub phase: String,
    #[serde(default, rename = "hostIP")]
    pub host_ip: String,
    #[serde(default, rename = "containerStatuses")]
    pub container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContainerStatus {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub image: String,
    /// Raw state object keyed by kind, e.g. `{"running": {...}}`.
    #[serde(default)]
    pub state: serde_json::Value,
}

impl ContainerStatus {
    /// The state kind kubectl reports: "running", "waiting", "terminated".
    pub fn state_label(&self) -> &str {
        self.state
            .as_object()
            .and_then(|state| state.keys().next())
            .map_or("unknown", String::as_str)
    }

    /// One-cell summary; not-ready containers are marked with `!`.
    pub fn summary(&self) -> String {
        let marker = if self.ready { "" } else { "!" };
        format!("{}={}{}", self.name, self.state_label(), marker)
    }
}

/// Listable pod columns.
///
/// Column names map to explicit accessors rather than any runtime attribute
/// lookup, so an unknown name fails loudly at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodColumn {
    Namespace,
    Name,
    Node,
    NodeIp,
    Status,
    Containers,
}

impl PodColumn {
    pub const ALL: [PodColumn; 6] = [
        PodColumn::Namespace,
        PodColumn::Name,
        PodColumn::Node,
        PodColumn::NodeIp,
        PodColumn::Status,
        PodColumn::Containers,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            PodColumn::Namespace => "namespace",
            PodColumn::Name => "name",
            PodColumn::Node => "node",
            PodColumn::NodeIp => "node-ip",
            PodColumn::Status => "status",
            PodColumn::Containers => "containers",
        }
    }

    /// Extract this column's cell for one pod.
    ///
    /// `containers` is the already-filtered container set for the pod (the
    /// containers column must reflect the selection, not everything the pod
    /// runs).
    pub fn extract(&self, pod: &Pod, containers: &[ContainerStatus]) -> String {
        match self {
            PodColumn::Namespace => pod.metadata.namespace.clone(),
            PodColumn::Name => pod.metadata.name.clone(),
            PodColumn::Node => pod.spec.node_name.clone(),
            PodColumn::NodeIp => pod.status.host_ip.clone(),
            PodColumn::Status => pod.status.phase.clone(),
            PodColumn::Containers => containers
                .iter()
                .map(ContainerStatus::summary)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl fmt::Display for PodColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl FromStr for PodColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "namespace" => Ok(PodColumn::Namespace),
            "name" => Ok(PodColumn::Name),
            "node" => Ok(PodColumn::Node),
            "node-ip" => Ok(PodColumn::NodeIp),
            "status" => Ok(PodColumn::Status),
            "containers" => Ok(PodColumn::Containers),
            other => {
                let known = PodColumn::ALL.map(|c| c.header()).join(", ");
                bail!("unknown column {other:?} (expected one of: {known})")
            }
        }
    }
}
