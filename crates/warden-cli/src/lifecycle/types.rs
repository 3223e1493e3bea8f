//! Verbs accepted by the supervisor and the channel it reports through.
//!
//! Every lifecycle verb prints a single outcome line on stdout (the service
//! state an operator or script acts on) and optional notes on stderr (log
//! locations, remediation hints).

use std::fmt;
use std::io::{self, Write};

use warden_config::Config;

use super::LifecycleError;

/// Service lifecycle verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Start,
    Stop,
    Status,
}

impl LifecycleCommand {
    /// Subcommand spelling, as typed after `warden`.
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.verb())
    }
}

/// Resolved configuration for one supervised service.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleContext<'a> {
    pub config: &'a Config,
}

impl LifecycleContext<'_> {
    /// Name used to refer to the service in every report.
    pub fn service_name(&self) -> &str {
        self.config.service_name()
    }
}

/// Where lifecycle reports go: outcomes on `stdout`, notes on `stderr`.
pub struct LifecycleOutput<W: Write, E: Write> {
    pub stdout: W,
    pub stderr: E,
}

impl<W: Write, E: Write> LifecycleOutput<W, E> {
    pub fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    /// Reports the state the service ended up in.
    pub fn outcome(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        emit(&mut self.stdout, args).map_err(LifecycleError::Io)
    }

    /// Adds operator guidance that scripts reading stdout can ignore.
    pub fn note(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        emit(&mut self.stderr, args).map_err(LifecycleError::Io)
    }
}

// Flushed per line so reports interleave correctly with the service's own
// output when both share a terminal.
fn emit<T: Write>(target: &mut T, args: fmt::Arguments<'_>) -> io::Result<()> {
    writeln!(target, "{args}")?;
    target.flush()
}
