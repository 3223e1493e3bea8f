//! Command-line runtime for the Warden process supervisor.
//!
//! The module owns argument parsing, configuration bootstrapping, telemetry
//! set-up, and dispatch to the lifecycle controller or the log query engine.
//! The interface is designed to be exercised both from the binary entrypoint
//! and from tests where configuration loading, the lifecycle handler, and IO
//! streams can be substituted.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use warden_config::Config;

mod cli;
mod config;
mod errors;
mod lifecycle;
mod logs;
mod telemetry;

use cli::{Cli, Dispatch};
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use lifecycle::{
    LifecycleCommand, LifecycleContext, LifecycleError, LifecycleOutput, SystemLifecycle,
};
use logs::{LogQuery, LogQueryEngine, render_outcome};

/// Exit status for command-line usage errors, following clap's convention.
const USAGE_EXIT_CODE: u8 = 2;

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    io: IoStreams<'a, W, E>,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        self.run_with_handler(args, |command, context, output| {
            SystemLifecycle::install()?.handle(command, context, output)
        })
    }

    fn run_with_handler<I, F>(&mut self, args: I, mut handler: F) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        F: FnMut(
            LifecycleCommand,
            LifecycleContext<'_>,
            &mut LifecycleOutput<&mut W, &mut E>,
        ) -> Result<ExitCode, LifecycleError>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error) => return self.report_usage(&error),
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| {
                telemetry::initialise(&config)?;
                Ok(config)
            })
            .and_then(|config| match Dispatch::from(cli.command) {
                Dispatch::Lifecycle(command) => {
                    let context = LifecycleContext { config: &config };
                    let mut output =
                        LifecycleOutput::new(&mut *self.io.stdout, &mut *self.io.stderr);
                    handler(command, context, &mut output).map_err(AppError::from)
                }
                Dispatch::Log(query) => run_log_query(&config, &query, &mut *self.io.stdout),
            });

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }

    /// Prints clap output; help and version requests are not failures.
    fn report_usage(&mut self, error: &clap::Error) -> ExitCode {
        let rendered = error.render();
        if error.use_stderr() {
            let _ = write!(self.io.stderr, "{rendered}");
            ExitCode::from(USAGE_EXIT_CODE)
        } else {
            let _ = write!(self.io.stdout, "{rendered}");
            ExitCode::SUCCESS
        }
    }
}

fn run_log_query<W: Write>(
    config: &Config,
    query: &LogQuery,
    stdout: &mut W,
) -> Result<ExitCode, AppError> {
    let engine = LogQueryEngine::new(config.log_file());
    let outcome = engine.query(query)?;
    render_outcome(&outcome, stdout).map_err(AppError::WriteOutput)?;
    Ok(ExitCode::SUCCESS)
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let io = IoStreams::new(stdout, stderr);
    CliRunner::new(io, &OrthoConfigLoader).run(args)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut cli_arguments: Vec<OsString> = Vec::new();
    if let Some(first) = args.first() {
        cli_arguments.push(first.clone());
    }
    if let Some(rest) = args.get(split.command_start..) {
        cli_arguments.extend(rest.iter().cloned());
    }
    cli_arguments
}
