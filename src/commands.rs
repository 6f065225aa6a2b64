// src/commands.rs

//! Subcommand drivers. Each returns the process exit code to use: the
//! orchestrator's aggregate, so any failed invocation in a batch surfaces as
//! a non-zero exit without aborting its siblings.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use tracing::warn;

use crate::cli::DEFAULT_SHELL;
use crate::exec::RowCollector;
use crate::kube::{Cluster, Node, PodColumn};
use crate::render;

/// Width used for per-pod banners.
const BANNER_WIDTH: usize = 80;

/// List matching pods and containers over the requested columns.
pub async fn list(cluster: &mut Cluster, columns: &str, no_headers: bool) -> Result<i32> {
    let columns: Vec<PodColumn> = columns
        .split(',')
        .map(|c| c.trim().parse())
        .collect::<Result<_>>()?;

    let mut rows = Vec::new();
    for sel in cluster.selected().await? {
        rows.push(
            columns
                .iter()
                .map(|col| col.extract(&sel.pod, &sel.containers))
                .collect(),
        );
    }

    let headers: Vec<String> = columns.iter().map(|c| c.header().to_string()).collect();
    let headers = if no_headers { None } else { Some(&headers[..]) };
    print!("{}", render::plain_table(headers, &rows));
    Ok(0)
}

#[derive(Debug, Clone)]
pub struct EachOptions {
    pub shell: String,
    pub interactive: bool,
    pub detach: bool,
    pub prefix: bool,
    pub command: String,
    pub arguments: Vec<String>,
}

impl EachOptions {
    /// Options for a remote REPL session: an interactive `each` with the
    /// default shell and no fan-out flags.
    pub fn repl(command: String, arguments: Vec<String>) -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            interactive: true,
            detach: false,
            prefix: false,
            command,
            arguments,
        }
    }
}

/// Execute a command remotely in every matched ready container.
pub async fn each(cluster: &mut Cluster, opts: EachOptions) -> Result<i32> {
    if opts.interactive && (opts.detach || opts.prefix) {
        bail!("--interactive does not operate together with --detach or --prefix");
    }

    // Interactive sessions go through `env` so terminal apps get a TERM.
    let mut remote_args: Vec<String> = if opts.interactive {
        vec![
            "env".to_string(),
            "TERM=xterm".to_string(),
            opts.command.clone(),
        ]
    } else {
        vec![opts.command.clone()]
    };
    for arg in &opts.arguments {
        remote_args.push(quote(arg)?);
    }
    let remote_cmd = [
        opts.shell.clone(),
        "-c".to_string(),
        remote_args.join(" "),
    ];

    let selected = cluster.selected().await?;
    let ctl = cluster.kubectl.ctl.clone();
    for sel in &selected {
        let namespace = &sel.pod.metadata.namespace;
        let pod_name = &sel.pod.metadata.name;
        for container in &sel.containers {
            if !container.ready {
                warn!(
                    pod = %pod_name,
                    container = %container.name,
                    "skipping container that is not ready"
                );
                continue;
            }

            let mut args: Vec<String> = Vec::new();
            if opts.interactive {
                args.push("-ti".to_string());
            }
            args.extend([
                "-n".to_string(),
                namespace.clone(),
                "-c".to_string(),
                container.name.clone(),
                pod_name.clone(),
                "--".to_string(),
            ]);
            args.extend(remote_cmd.iter().cloned());

            if opts.prefix {
                let prefix = format!("[{pod_name}/{}] ", container.name);
                ctl.run_prefixed(&prefix, "exec", &args)?;
            } else if opts.detach {
                ctl.run_detached("exec", &args)?;
            } else {
                ctl.run("exec", &args).await?;
            }
        }
    }

    ctl.join().await
}

/// Invoke a kubectl subcommand once per matched pod, with a title banner.
pub async fn each_pod(cluster: &mut Cluster, command: &str, arguments: &[String]) -> Result<i32> {
    let selected = cluster.selected().await?;
    let ctl = cluster.kubectl.ctl.clone();
    for sel in &selected {
        let namespace = &sel.pod.metadata.namespace;
        let pod_name = &sel.pod.metadata.name;
        println!(
            "{}",
            render::banner(&format!("{namespace}/{pod_name}"), BANNER_WIDTH)
        );

        let mut args = vec!["-n".to_string(), namespace.clone()];
        args.extend(arguments.iter().cloned());
        args.push(pod_name.clone());
        ctl.run(command, &args).await?;
    }

    ctl.join().await
}

#[derive(Debug, Clone)]
pub struct TailOptions {
    pub follow: bool,
    pub prefix: bool,
    pub number: String,
}

/// Stream recent logs from every matched container concurrently.
pub async fn tail(cluster: &mut Cluster, opts: TailOptions) -> Result<i32> {
    let mut log_args: Vec<String> = if opts.number.chars().all(|c| c.is_ascii_digit()) {
        vec!["--tail".to_string(), opts.number.clone()]
    } else {
        vec!["--since".to_string(), opts.number.clone()]
    };
    if opts.follow {
        log_args.push("-f".to_string());
    }

    let selected = cluster.selected().await?;
    let ctl = cluster.kubectl.ctl.clone();
    for sel in &selected {
        let pod_name = &sel.pod.metadata.name;
        for container in &sel.containers {
            let mut args = vec![
                "-n".to_string(),
                sel.pod.metadata.namespace.clone(),
                "-c".to_string(),
                container.name.clone(),
            ];
            args.extend(log_args.iter().cloned());
            args.push(pod_name.clone());

            if opts.prefix {
                let prefix = format!("[{pod_name}:{}] ", container.name);
                ctl.run_prefixed(&prefix, "logs", &args)?;
            } else {
                ctl.run_detached("logs", &args)?;
            }
        }
    }

    ctl.join().await
}

/// Show `kubectl top node` rows for nodes hosting matched pods, enriched
/// with each node's condition and address details.
pub async fn health(cluster: &mut Cluster, no_headers: bool) -> Result<i32> {
    let selected = cluster.selected().await?;
    let hosting: HashSet<String> = selected
        .iter()
        .map(|sel| sel.pod.spec.node_name.clone())
        .collect();
    let nodes = cluster.nodes().await?;
    let details: HashMap<&str, &Node> = nodes
        .iter()
        .map(|node| (node.metadata.name.as_str(), node))
        .collect();

    let collector = Arc::new(Mutex::new(RowCollector::new()));
    let ctl = cluster.kubectl.ctl.clone();
    ctl.run_tabular(
        RowCollector::handler(collector.clone()),
        "top",
        &["node".to_string()],
    )?;
    let code = ctl.join().await?;

    let collector = collector.lock().unwrap();
    let mut rows: Vec<Vec<String>> = collector
        .rows
        .iter()
        .filter(|row| row.first().is_some_and(|name| hosting.contains(name)))
        .cloned()
        .collect();
    for row in &mut rows {
        let detail = row
            .first()
            .and_then(|name| details.get(name.as_str()).copied());
        row.push(detail.map(Node::conditions_summary).unwrap_or_default());
        row.push(detail.map(|node| node.addresses().join(" ")).unwrap_or_default());
    }
    rows.sort();

    let headers = collector.headers.clone().map(|mut headers| {
        headers.extend(["CONDITIONS".to_string(), "ADDRESSES".to_string()]);
        headers
    });
    let headers = if no_headers { None } else { headers.as_deref() };
    print!("{}", render::plain_table(headers, &rows));
    Ok(code)
}

/// Minimal shell quoting for remote execution.
///
/// Deliberately not full shell escaping: unquoted args keep glob expansion
/// working on the remote side. Only args containing spaces are wrapped, and
/// an arg mixing both quote characters cannot be represented.
fn quote(arg: &str) -> Result<String> {
    if !arg.contains(' ') || already_quoted(arg) {
        return Ok(arg.to_string());
    }
    if arg.contains('\'') {
        if arg.contains('"') {
            bail!("unable to quote argument: {arg}");
        }
        return Ok(format!("\"{arg}\""));
    }
    Ok(format!("'{arg}'"))
}

fn already_quoted(arg: &str) -> bool {
    let mut chars = arg.chars();
    match (chars.next(), arg.chars().next_back()) {
        (Some(first), Some(last)) if arg.chars().count() >= 2 => {
            matches!(first, '\'' | '"') && matches!(last, '\'' | '"')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_args_pass_through_for_remote_globbing() {
        assert_eq!(quote("*.log").unwrap(), "*.log");
        assert_eq!(quote("simple").unwrap(), "simple");
    }

    #[test]
    fn args_with_spaces_get_wrapped() {
        assert_eq!(quote("two words").unwrap(), "'two words'");
        assert_eq!(quote("it's here").unwrap(), "\"it's here\"");
    }

    #[test]
    fn pre_quoted_args_are_kept() {
        assert_eq!(quote("'already done'").unwrap(), "'already done'");
    }

    #[test]
    fn mixed_quotes_cannot_be_represented() {
        assert!(quote("both ' and \"").is_err());
    }

    #[test]
    fn repl_options_are_an_interactive_each() {
        let opts = EachOptions::repl("bash".to_string(), vec!["-l".to_string()]);
        assert!(opts.interactive);
        assert!(!opts.detach);
        assert!(!opts.prefix);
        assert_eq!(opts.shell, DEFAULT_SHELL);
        assert_eq!(opts.command, "bash");
    }
}
