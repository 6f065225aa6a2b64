// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Columns shown by `list` when none are requested.
pub const DEFAULT_COLUMNS: &str = "namespace,name,node,status,containers";

/// Shell used for remote execution unless overridden.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Command-line arguments for `kubefan`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "kubefan",
    version,
    about = "Fan kubectl operations out across matching pods and containers.",
    long_about = None
)]
pub struct CliArgs {
    /// kubectl context to use when selecting.
    ///
    /// Default: the current context reported by `kubectl config current-context`.
    #[arg(short = 'c', long, value_name = "NAME")]
    pub context: Option<String>,

    /// Namespace substring to select within (use "." to match any namespace).
    #[arg(short = 'n', long, value_name = "NAME", default_value = "production")]
    pub namespace: String,

    /// Number of seconds to keep pod/namespace enumerations cached.
    #[arg(long, value_name = "SECONDS", default_value_t = 300)]
    pub cache_seconds: u64,

    /// Maximum number of pod matches.
    #[arg(short = 'm', long, value_name = "N")]
    pub max: Option<usize>,

    /// Disable table headers in output.
    #[arg(long)]
    pub no_headers: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `KUBEFAN_LOG` or a default level will be used.
    #[arg(short = 'l', long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Selector of the form [NODE/]POD[/CONTAINER].
    ///
    /// Each part is a case-insensitive regular expression; an empty part
    /// matches anything. Use a trailing slash for partial forms, e.g.
    /// `my-node//` to match every pod and container hosted on `my-node`.
    #[arg(value_name = "MATCH")]
    pub matcher: String,

    #[command(subcommand)]
    pub command: Option<KubefanCommand>,
}

/// Subcommands; the default (no subcommand) behaves like `list`.
#[derive(Debug, Clone, Subcommand)]
pub enum KubefanCommand {
    /// List matching pods and containers.
    List {
        /// Comma-separated columns to show.
        #[arg(short, long, value_name = "COLS", default_value = DEFAULT_COLUMNS)]
        columns: String,
    },

    /// Execute a command remotely in every matched (ready) container.
    Each {
        /// Shell used for remote execution.
        #[arg(short, long, value_name = "PATH", default_value = DEFAULT_SHELL)]
        shell: String,

        /// Require an interactive session (REPLs, shells, anything needing input).
        #[arg(short, long)]
        interactive: bool,

        /// Fire off all invocations concurrently without capturing output.
        #[arg(short = 'a', long)]
        detach: bool,

        /// Prefix every output line with the pod and container names.
        #[arg(short, long)]
        prefix: bool,

        /// Command to run remotely.
        command: String,

        /// Arguments passed to the remote command.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        arguments: Vec<String>,
    },

    /// Start an interactive REPL remotely (a shell, a console, anything
    /// needing input). Shorthand for `each --interactive`.
    Repl {
        /// Program to run remotely.
        command: String,

        /// Arguments passed to the REPL.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        arguments: Vec<String>,
    },

    /// Invoke a kubectl subcommand once per matched pod.
    EachPod {
        /// kubectl subcommand to invoke (e.g. `describe`).
        command: String,

        /// Extra arguments placed before the pod name.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        arguments: Vec<String>,
    },

    /// Show recent logs from containers for each pod matched.
    Tail {
        /// Stream new logs until interrupted.
        #[arg(short, long)]
        follow: bool,

        /// Prefix every line with the pod and container names.
        #[arg(short, long)]
        prefix: bool,

        /// Count of recent lines, or a relative duration (e.g. 5s, 2m, 3h).
        #[arg(value_name = "NUMBER", default_value = "10")]
        number: String,
    },

    /// Show resource usage for the nodes hosting matched pods.
    Health,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_levels_map_to_tracing_levels() {
        assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
        assert_eq!(tracing::Level::from(LogLevel::Trace), tracing::Level::TRACE);
    }

    #[test]
    fn repl_parses_like_a_subcommand_with_trailing_arguments() {
        let args = CliArgs::parse_from(["kubefan", "web", "repl", "bash", "-l"]);
        match args.command {
            Some(KubefanCommand::Repl { command, arguments }) => {
                assert_eq!(command, "bash");
                assert_eq!(arguments, vec!["-l"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
