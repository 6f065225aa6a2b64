// src/kube/kubectl.rs

//! kubectl-specific wrapper around the generic orchestrator.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::debug;

use crate::exec::Orchestrator;

/// Handle to one kubectl context.
///
/// Every invocation goes through the shared [`Orchestrator`], whose prefix
/// arguments pin the context, so concurrent fan-out commands and the signal
/// listener all see the same tracked set.
#[derive(Clone)]
pub struct KubeCtl {
    pub ctl: Arc<Orchestrator>,
    pub context: String,
}

impl KubeCtl {
    /// Locate `kubectl` and resolve the context to operate in.
    ///
    /// When no context is given, the current one is captured from
    /// `kubectl config current-context`.
    pub async fn connect(context: Option<String>) -> Result<Self> {
        let context = match context {
            Some(context) => context,
            None => {
                let probe = Orchestrator::new("kubectl", Vec::new())?;
                probe
                    .run_capture("config", &["current-context".to_string()])
                    .await
                    .context("resolving current kubectl context")?
                    .trim()
                    .to_string()
            }
        };
        if context.is_empty() {
            bail!("could not determine a kubectl context");
        }
        debug!(context = %context, "connected kubectl");

        let ctl = Arc::new(Orchestrator::new(
            "kubectl",
            vec!["--context".to_string(), context.clone()],
        )?);
        Ok(Self { ctl, context })
    }

    /// Captured kubectl call with `--output=json`, parsed into a JSON value.
    pub async fn run_json(&self, subcommand: &str, args: &[String]) -> Result<Value> {
        let mut full = args.to_vec();
        full.push("--output=json".to_string());
        let body = self.ctl.run_capture(subcommand, &full).await?;
        serde_json::from_str(&body)
            .with_context(|| format!("parsing JSON output of kubectl {subcommand}"))
    }
}
