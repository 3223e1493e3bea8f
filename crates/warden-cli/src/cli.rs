//! Command-line surface of the `warden` binary.

use clap::{Args, Parser, Subcommand};

use crate::lifecycle::LifecycleCommand;
use crate::logs::LogQuery;

/// Default number of trailing log lines inspected by `warden log`.
pub(crate) const DEFAULT_LOG_TAIL: usize = 50;

#[derive(Parser, Debug)]
#[command(
    name = "warden",
    version,
    about = "Supervise a single background service",
    long_about = "Supervise a single background service.\n\n\
        Configuration flags such as --pid-file or --config-path must precede \
        the subcommand; they may also be set through WARDEN_* environment \
        variables or a configuration file."
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Run collaborators and start the service in the background.
    Start,
    /// Stop the running service.
    Stop,
    /// Report whether the service is running.
    Status,
    /// Show recent service output.
    Log(LogArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogArgs {
    /// Case-insensitive regular expression records must match.
    #[arg(value_name = "PATTERN")]
    pub(crate) pattern: Option<String>,
    /// Number of trailing lines to inspect; 0 inspects the whole file.
    #[arg(long, default_value_t = DEFAULT_LOG_TAIL)]
    pub(crate) tail: usize,
    /// Only keep records carrying this severity token, e.g. error or warn.
    #[arg(long)]
    pub(crate) level: Option<String>,
}

impl From<LogArgs> for LogQuery {
    fn from(args: LogArgs) -> Self {
        Self {
            tail: args.tail,
            level: args.level,
            pattern: args.pattern,
        }
    }
}

/// What the runtime should do for a parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Dispatch {
    Lifecycle(LifecycleCommand),
    Log(LogQuery),
}

impl From<CliCommand> for Dispatch {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Start => Self::Lifecycle(LifecycleCommand::Start),
            CliCommand::Stop => Self::Lifecycle(LifecycleCommand::Stop),
            CliCommand::Status => Self::Lifecycle(LifecycleCommand::Status),
            CliCommand::Log(args) => Self::Log(args.into()),
        }
    }
}
