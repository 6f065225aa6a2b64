// src/kube/mod.rs

//! Kubernetes-facing layer: kubectl wrapper, pod models, and selection.

pub mod cluster;
pub mod kubectl;
pub mod matcher;
pub mod nodes;
pub mod pods;

pub use cluster::{ANY_NAMESPACE, Cluster, ClusterOptions, SelectedPod};
pub use kubectl::KubeCtl;
pub use matcher::MatchExpr;
pub use nodes::{Node, NodeList};
pub use pods::{ContainerStatus, Pod, PodColumn, PodList};
