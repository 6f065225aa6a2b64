// src/kube/matcher.rs

//! `[NODE/]POD[/CONTAINER]` match expressions.
//!
//! Each part is a case-insensitive regular expression; an empty part matches
//! anything. With one part only the pod is constrained; with two, pod and
//! container; with three, node, pod, and container.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

/// Compiled selector for nodes, pods, and containers.
#[derive(Debug, Clone)]
pub struct MatchExpr {
    node: Regex,
    pod: Regex,
    container: Regex,
}

impl MatchExpr {
    pub fn parse(expr: &str) -> Result<Self> {
        let parts: Vec<&str> = expr.splitn(3, '/').collect();
        let (node, pod, container) = match parts.as_slice() {
            [pod] => ("", *pod, ""),
            [pod, container] => ("", *pod, *container),
            [node, pod, container] => (*node, *pod, *container),
            _ => ("", "", ""),
        };
        Ok(Self {
            node: compile(node)?,
            pod: compile(pod)?,
            container: compile(container)?,
        })
    }

    pub fn node_matches(&self, name: &str) -> bool {
        self.node.is_match(name)
    }

    pub fn pod_matches(&self, name: &str) -> bool {
        self.pod.is_match(name)
    }

    pub fn container_matches(&self, name: &str) -> bool {
        self.container.is_match(name)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid match pattern {pattern:?}"))
}
