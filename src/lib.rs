// src/lib.rs

pub mod cache;
pub mod cli;
pub mod commands;
pub mod errors;
pub mod exec;
pub mod kube;
pub mod logging;
pub mod render;

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::cli::{CliArgs, DEFAULT_COLUMNS, KubefanCommand};
use crate::errors::Result;
use crate::commands::{EachOptions, TailOptions};
use crate::exec::Orchestrator;
use crate::kube::{Cluster, ClusterOptions, MatchExpr};

/// Exit code reserved for interrupted runs, distinct from both success and
/// ordinary command failure.
pub const INTERRUPT_EXIT_CODE: i32 = 22;

/// High-level entry point used by `main.rs`.
///
/// Returns the exit code the process should finish with: 0 on success, the
/// aggregate exit code when any fanned-out invocation failed.
pub async fn run(args: CliArgs) -> Result<i32> {
    let matcher = MatchExpr::parse(&args.matcher)?;
    let options = ClusterOptions {
        context: args.context.clone(),
        namespace: args.namespace.clone(),
        cache_ttl: Duration::from_secs(args.cache_seconds),
        limit: args.max,
    };
    let mut cluster = Cluster::connect(options, matcher).await?;

    // SIGINT/SIGTERM → kill everything tracked, exit with the reserved code.
    spawn_signal_listener(cluster.kubectl.ctl.clone());

    let command = args.command.unwrap_or(KubefanCommand::List {
        columns: DEFAULT_COLUMNS.to_string(),
    });

    match command {
        KubefanCommand::List { columns } => {
            commands::list(&mut cluster, &columns, args.no_headers).await
        }
        KubefanCommand::Each {
            shell,
            interactive,
            detach,
            prefix,
            command,
            arguments,
        } => {
            commands::each(
                &mut cluster,
                EachOptions {
                    shell,
                    interactive,
                    detach,
                    prefix,
                    command,
                    arguments,
                },
            )
            .await
        }
        KubefanCommand::Repl { command, arguments } => {
            commands::each(&mut cluster, EachOptions::repl(command, arguments)).await
        }
        KubefanCommand::EachPod { command, arguments } => {
            commands::each_pod(&mut cluster, &command, &arguments).await
        }
        KubefanCommand::Tail {
            follow,
            prefix,
            number,
        } => {
            commands::tail(
                &mut cluster,
                TailOptions {
                    follow,
                    prefix,
                    number,
                },
            )
            .await
        }
        KubefanCommand::Health => commands::health(&mut cluster, args.no_headers).await,
    }
}

/// Listen for interrupt/terminate and cancel every tracked invocation.
///
/// The listener holds its own handle to the shared orchestrator rather than
/// reaching into global state; cancelling kills each child, waits for it to
/// be reaped, and lets the consumer tasks see end-of-stream before the
/// process exits.
fn spawn_signal_listener(ctl: Arc<Orchestrator>) {
    tokio::spawn(async move {
        wait_for_interrupt().await;
        warn!(
            tracked = ctl.tracked_len(),
            "interrupted; terminating tracked processes"
        );
        ctl.cancel(None).await;
        std::process::exit(INTERRUPT_EXIT_CODE);
    });
}

#[cfg(unix)]
async fn wait_for_interrupt() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(err) => {
            warn!(error = %err, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() {
    let _ = tokio::signal::ctrl_c().await;
}
