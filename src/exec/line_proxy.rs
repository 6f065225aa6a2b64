// src/exec/line_proxy.rs

//! Background line proxy for child-process pipes.
//!
//! A child that writes to both stdout and stderr can fill one OS pipe buffer
//! while the parent is blocked reading the other, deadlocking both sides.
//! Every captured pipe therefore gets its own Tokio task that drains it line
//! by line until end-of-stream, handing each line to a caller-supplied
//! handler.
//!
//! Handlers are infallible by contract (`FnMut(&str)`); the only errors that
//! can end a proxy early are pipe read errors, which are surfaced through the
//! returned join handle when the owning invocation is joined.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::trace;

/// Spawn a task that reads `pipe` to end-of-stream, invoking `handler` once
/// per line.
///
/// A trailing line without a final newline is still delivered. The pipe is
/// owned by the task and closed when it exits, whether or not reading
/// succeeded.
pub fn spawn_line_proxy<R, F>(pipe: R, mut handler: F) -> JoinHandle<Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
    F: FnMut(&str) + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .context("reading line from child pipe")?
        {
            handler(&line);
        }
        trace!("line proxy reached end-of-stream");
        Ok(())
    })
}

/// Wrap a sink so that every line is forwarded as `prefix + line`.
///
/// Used to keep interleaved output from several concurrent processes
/// attributable to the process that produced it.
pub fn prefix_lines<F>(prefix: impl Into<String>, mut forward: F) -> impl FnMut(&str) + Send + 'static
where
    F: FnMut(&str) + Send + 'static,
{
    let prefix = prefix.into();
    move |line: &str| forward(&format!("{prefix}{line}"))
}
