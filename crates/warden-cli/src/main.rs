//! CLI entrypoint for the Warden process supervisor.
//!
//! The binary delegates to [`warden_cli::run`], which loads configuration,
//! parses the subcommand, and drives the lifecycle controller or the log
//! query engine.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    warden_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
