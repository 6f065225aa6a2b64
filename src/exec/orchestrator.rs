// src/exec/orchestrator.rs

//! Concurrent child-process orchestration.
//!
//! An [`Orchestrator`] launches every invocation of one external program
//! (a fixed program path plus fixed prefix arguments), tracks the handles of
//! everything launched in the background, and reconciles their exit codes
//! into a single aggregate status at `join` time.
//!
//! Aggregate policy: the aggregate starts at 0 and is overwritten by any
//! non-zero exit code observed, so the last failure seen wins. Individual
//! failures never abort sibling invocations; they are logged with the full
//! command line and surface only through the aggregate.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::exec::line_proxy::{prefix_lines, spawn_line_proxy};
use crate::exec::table_stream::spawn_table_rows;

/// One launched child process plus the consumer tasks draining its pipes.
///
/// The invocation is not finished until the process has exited *and* every
/// consumer has observed end-of-stream; `join` waits for both.
struct TrackedInvocation {
    argv: Vec<String>,
    child: Child,
    consumers: Vec<JoinHandle<Result<()>>>,
}

/// Launches and tracks concurrent invocations of one external program.
pub struct Orchestrator {
    program: PathBuf,
    prefix_args: Vec<String>,
    tracked: Mutex<Vec<TrackedInvocation>>,
    aggregate: Mutex<i32>,
}

impl Orchestrator {
    /// Build an orchestrator for `program_name`, located in `PATH`.
    ///
    /// `prefix_args` are prepended to every invocation (e.g. a context
    /// selector). Failing to locate the program is fatal.
    pub fn new(program_name: &str, prefix_args: Vec<String>) -> Result<Self> {
        Ok(Self::from_path(locate_program(program_name)?, prefix_args))
    }

    /// Build an orchestrator around an already-resolved program path.
    pub fn from_path(program: impl Into<PathBuf>, prefix_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            prefix_args,
            tracked: Mutex::new(Vec::new()),
            aggregate: Mutex::new(0),
        }
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Number of invocations launched and not yet joined or cancelled.
    pub fn tracked_len(&self) -> usize {
        self.tracked.lock().unwrap().len()
    }

    /// Run an invocation with inherited stdio, blocking until it exits.
    ///
    /// The exit code is recorded into the aggregate and returned.
    pub async fn run(&self, subcommand: &str, args: &[String]) -> Result<i32> {
        let argv = self.command_line(subcommand, args);
        let mut child = self.spawn(&argv, |_| {})?;
        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for `{}`", argv.join(" ")))?;
        let code = status.code().unwrap_or(-1);
        self.record_exit(&argv, code);
        Ok(code)
    }

    /// Run an invocation and capture its stdout as a string.
    ///
    /// stderr passes through to the caller's terminal. A non-zero exit is an
    /// error here rather than an aggregate entry: captured calls feed
    /// decisions, so there is no useful partial result.
    pub async fn run_capture(&self, subcommand: &str, args: &[String]) -> Result<String> {
        let argv = self.command_line(subcommand, args);
        let child = self.spawn(&argv, |cmd| {
            cmd.stdin(Stdio::null()).stdout(Stdio::piped());
        })?;
        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for `{}`", argv.join(" ")))?;
        if !output.status.success() {
            bail!(
                "`{}` exited with status {}",
                argv.join(" "),
                output.status.code().unwrap_or(-1)
            );
        }
        String::from_utf8(output.stdout)
            .with_context(|| format!("`{}` produced non-UTF-8 output", argv.join(" ")))
    }

    /// Fire-and-forget: spawn without capturing output and track the handle.
    ///
    /// The caller must eventually `join` (or `cancel`).
    pub fn run_detached(&self, subcommand: &str, args: &[String]) -> Result<()> {
        let argv = self.command_line(subcommand, args);
        let child = self.spawn(&argv, |_| {})?;
        self.track(argv, child, Vec::new());
        Ok(())
    }

    /// Spawn with stdout and stderr drained through prefixing line proxies.
    ///
    /// stdout lines are forwarded to this process's stdout as
    /// `prefix + line`; stderr lines go to stderr tagged `[ERR] prefix`.
    /// Tracked for a later `join`.
    pub fn run_prefixed(&self, prefix: &str, subcommand: &str, args: &[String]) -> Result<()> {
        let argv = self.command_line(subcommand, args);
        let mut child = self.spawn(&argv, |cmd| {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        })?;
        let stdout = child.stdout.take().context("child stdout pipe missing")?;
        let stderr = child.stderr.take().context("child stderr pipe missing")?;

        let out = spawn_line_proxy(stdout, prefix_lines(prefix, |line| println!("{line}")));
        let err = spawn_line_proxy(
            stderr,
            prefix_lines(format!("[ERR] {prefix}"), |line| eprintln!("{line}")),
        );
        self.track(argv, child, vec![out, err]);
        Ok(())
    }

    /// Spawn with stdout parsed as a columnar table into `row_handler`.
    ///
    /// Rows are delivered incrementally as the child produces them; see
    /// [`spawn_table_rows`] for the handler contract. Tracked for a later
    /// `join`, which also surfaces any table parse error.
    pub fn run_tabular<F>(&self, row_handler: F, subcommand: &str, args: &[String]) -> Result<()>
    where
        F: FnMut(usize, Vec<String>) + Send + 'static,
    {
        let argv = self.command_line(subcommand, args);
        let mut child = self.spawn(&argv, |cmd| {
            cmd.stdout(Stdio::piped());
        })?;
        let stdout = child.stdout.take().context("child stdout pipe missing")?;
        let rows = spawn_table_rows(stdout, row_handler);
        self.track(argv, child, vec![rows]);
        Ok(())
    }

    /// Wait for every tracked invocation and its consumer tasks to finish.
    ///
    /// Non-zero exits are recorded into the aggregate with a warning naming
    /// the full command line. Consumer-task errors (pipe read failures, table
    /// parse failures) and reap failures never abort sibling invocations:
    /// every tracked child is still waited on and its exit recorded, and only
    /// then is the first such error returned. On success, returns the
    /// aggregate exit code and resets it to 0; on error the aggregate is left
    /// in place for a later `join`.
    pub async fn join(&self) -> Result<i32> {
        let tracked = std::mem::take(&mut *self.tracked.lock().unwrap());
        let mut deferred: Option<anyhow::Error> = None;
        for mut invocation in tracked {
            match invocation.child.wait().await {
                Ok(status) => self.record_exit(&invocation.argv, status.code().unwrap_or(-1)),
                Err(err) => {
                    warn!(error = %err, cmd = %invocation.argv.join(" "), "failed to reap child");
                    deferred.get_or_insert(anyhow::Error::new(err).context(format!(
                        "waiting for `{}`",
                        invocation.argv.join(" ")
                    )));
                }
            }
            for consumer in invocation.consumers {
                let finished = consumer
                    .await
                    .context("output consumer task panicked")
                    .and_then(|result| result);
                if let Err(err) = finished {
                    warn!(error = %err, cmd = %invocation.argv.join(" "), "output consumer failed");
                    deferred.get_or_insert(err);
                }
            }
        }
        if let Some(err) = deferred {
            return Err(err);
        }

        let mut aggregate = self.aggregate.lock().unwrap();
        let code = *aggregate;
        *aggregate = 0;
        Ok(code)
    }

    /// Terminate every tracked invocation and wait for it to exit.
    ///
    /// With `signal` given (unix), that signal is delivered; otherwise the
    /// process is killed forcibly. Killing the child closes its pipes, so
    /// consumer tasks observe end-of-stream and finish; nothing is left
    /// orphaned. Exit codes are still recorded as reported.
    pub async fn cancel(&self, signal: Option<i32>) {
        let tracked = std::mem::take(&mut *self.tracked.lock().unwrap());
        for mut invocation in tracked {
            match (signal, invocation.child.id()) {
                #[cfg(unix)]
                (Some(sig), Some(pid)) => {
                    debug!(pid, sig, cmd = %invocation.argv.join(" "), "signalling child");
                    // SAFETY: plain kill(2) on a child pid this orchestrator spawned.
                    unsafe {
                        libc::kill(pid as libc::pid_t, sig);
                    }
                }
                _ => {
                    debug!(cmd = %invocation.argv.join(" "), "killing child");
                    if let Err(err) = invocation.child.start_kill() {
                        warn!(error = %err, cmd = %invocation.argv.join(" "), "failed to kill child");
                    }
                }
            }

            match invocation.child.wait().await {
                Ok(status) => self.record_exit(&invocation.argv, status.code().unwrap_or(-1)),
                Err(err) => {
                    warn!(error = %err, cmd = %invocation.argv.join(" "), "failed to reap cancelled child");
                }
            }
            for consumer in invocation.consumers {
                let _ = consumer.await;
            }
        }
    }

    /// Resolve the full argument vector for one invocation and log it.
    fn command_line(&self, subcommand: &str, args: &[String]) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.prefix_args.len() + args.len() + 2);
        argv.push(self.program.to_string_lossy().into_owned());
        argv.extend(self.prefix_args.iter().cloned());
        argv.push(subcommand.to_string());
        argv.extend(args.iter().cloned());
        debug!(cmd = %argv.join(" "), "resolved command line");
        argv
    }

    fn spawn(&self, argv: &[String], configure: impl FnOnce(&mut Command)) -> Result<Child> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&argv[1..]).kill_on_drop(true);
        configure(&mut cmd);
        cmd.spawn()
            .with_context(|| format!("spawning `{}`", argv.join(" ")))
    }

    fn track(&self, argv: Vec<String>, child: Child, consumers: Vec<JoinHandle<Result<()>>>) {
        self.tracked.lock().unwrap().push(TrackedInvocation {
            argv,
            child,
            consumers,
        });
    }

    fn record_exit(&self, argv: &[String], code: i32) {
        if code != 0 {
            warn!(cmd = %argv.join(" "), exit_code = code, "command exited non-zero");
            *self.aggregate.lock().unwrap() = code;
        }
    }
}

/// Locate `name` on `PATH` (or verify it directly when given as a path).
fn locate_program(name: &str) -> Result<PathBuf> {
    if name.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(name);
        if path.is_file() {
            return Ok(path);
        }
        bail!("program {name:?} does not exist");
    }

    let search = std::env::var_os("PATH").context("PATH environment variable is not set")?;
    std::env::split_paths(&search)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .with_context(|| format!("program {name:?} not found in PATH"))
}
