// src/kube/cluster.rs

//! Pod/container selection over cached cluster enumerations.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::debug;

use crate::cache::{TtlCache, cache_file_path};
use crate::kube::kubectl::KubeCtl;
use crate::kube::matcher::MatchExpr;
use crate::kube::nodes::{Node, NodeList};
use crate::kube::pods::{ContainerStatus, Pod, PodList};

/// Namespace selector meaning "any namespace".
pub const ANY_NAMESPACE: &str = ".";

#[derive(Debug, Clone)]
pub struct ClusterOptions {
    pub context: Option<String>,
    pub namespace: String,
    pub cache_ttl: Duration,
    pub limit: Option<usize>,
}

/// One matched pod with the subset of its containers that also matched.
#[derive(Debug, Clone)]
pub struct SelectedPod {
    pub pod: Pod,
    pub containers: Vec<ContainerStatus>,
}

/// Selection entry point: owns the kubectl handle and the enumeration caches.
pub struct Cluster {
    pub kubectl: KubeCtl,
    matcher: MatchExpr,
    namespace: String,
    limit: Option<usize>,
    pods: TtlCache<Value>,
    nodes: TtlCache<Value>,
}

impl Cluster {
    /// Connect to the context and validate the requested namespace against
    /// the (cached) namespace list.
    pub async fn connect(options: ClusterOptions, matcher: MatchExpr) -> Result<Self> {
        let kubectl = KubeCtl::connect(options.context).await?;

        if options.namespace != ANY_NAMESPACE {
            validate_namespace(&kubectl, &options.namespace, options.cache_ttl).await?;
        }

        let pods = TtlCache::new(
            cache_file_path(&kubectl.context, "pods")?,
            options.cache_ttl,
        );
        let nodes = TtlCache::new(
            cache_file_path(&kubectl.context, "nodes")?,
            options.cache_ttl,
        );

        Ok(Self {
            kubectl,
            matcher,
            namespace: options.namespace,
            limit: options.limit,
            pods,
            nodes,
        })
    }

    /// Pods (and their containers) matching the namespace and match
    /// expression, up to the configured limit.
    ///
    /// The pod enumeration goes through the TTL cache, so repeated
    /// invocations within the TTL do not re-run kubectl.
    pub async fn selected(&mut self) -> Result<Vec<SelectedPod>> {
        let Self { kubectl, pods, .. } = self;
        let args = vec!["pods".to_string(), "--all-namespaces".to_string()];
        let value = pods.get(|| kubectl.run_json("get", &args)).await?;
        let list: PodList = serde_json::from_value(value.clone())
            .context("interpreting cached pod enumeration")?;

        let mut selected = Vec::new();
        for pod in list.items {
            if self.namespace != ANY_NAMESPACE
                && !pod.metadata.namespace.contains(&self.namespace)
            {
                continue;
            }
            if !self.matcher.node_matches(&pod.spec.node_name) {
                continue;
            }
            if !self.matcher.pod_matches(&pod.metadata.name) {
                continue;
            }
            let containers: Vec<ContainerStatus> = pod
                .status
                .container_statuses
                .iter()
                .filter(|c| self.matcher.container_matches(&c.name))
                .cloned()
                .collect();
            if containers.is_empty() {
                continue;
            }
            selected.push(SelectedPod { pod, containers });
            if self.limit.is_some_and(|limit| selected.len() >= limit) {
                debug!(limit = self.limit, "stopping at match limit");
                break;
            }
        }
        Ok(selected)
    }

    /// Node enumeration for the context, through its own TTL cache.
    pub async fn nodes(&mut self) -> Result<Vec<Node>> {
        let Self { kubectl, nodes, .. } = self;
        let args = vec!["nodes".to_string()];
        let value = nodes.get(|| kubectl.run_json("get", &args)).await?;
        let list: NodeList = serde_json::from_value(value.clone())
            .context("interpreting cached node enumeration")?;
        Ok(list.items)
    }
}

async fn validate_namespace(kubectl: &KubeCtl, namespace: &str, ttl: Duration) -> Result<()> {
    let mut cache: TtlCache<Value> =
        TtlCache::new(cache_file_path(&kubectl.context, "namespaces")?, ttl);
    let args = vec!["namespaces".to_string()];
    let value = cache.get(|| kubectl.run_json("get", &args)).await?;

    let known = value
        .pointer("/items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.pointer("/metadata/name"))
                .filter_map(Value::as_str)
                .any(|name| name.contains(namespace))
        })
        .unwrap_or(false);

    if !known {
        bail!("unknown namespace {namespace:?} in context {:?}", kubectl.context);
    }
    Ok(())
}
