//! High-level orchestration for service lifecycle commands.
//!
//! This module wires configuration into the [`Supervisor`] with the
//! production store, probe, and launcher, and turns transition outcomes into
//! operator-facing messages.

use std::io::Write;
use std::process::ExitCode;

use warden_config::{Config, StatePaths};

use super::collaborators::{ToolchainCheck, plan_collaborators};
use super::error::LifecycleError;
use super::interrupt::InterruptFlag;
use super::probe::SystemProbe;
use super::process::{LaunchSpec, SystemLauncher};
use super::store::FileHandleStore;
use super::supervisor::{
    ServiceState, StartOutcome, StartPlan, StopOutcome, Supervisor, Timeouts,
};
use super::types::{LifecycleCommand, LifecycleContext, LifecycleOutput};

type SystemSupervisor = Supervisor<FileHandleStore, SystemProbe, SystemLauncher>;

/// Production lifecycle controller.
#[derive(Debug, Default)]
pub struct SystemLifecycle {
    interrupt: InterruptFlag,
}

impl SystemLifecycle {
    /// Creates a controller whose waits are cut short by SIGINT or SIGTERM.
    pub fn install() -> Result<Self, LifecycleError> {
        Ok(Self {
            interrupt: InterruptFlag::install()?,
        })
    }

    pub fn handle<W: Write, E: Write>(
        &mut self,
        command: LifecycleCommand,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        match command {
            LifecycleCommand::Start => self.start(context, output),
            LifecycleCommand::Stop => self.stop(context, output),
            LifecycleCommand::Status => self.status(context, output),
        }
    }

    fn supervisor(&self, config: &Config, paths: &StatePaths) -> SystemSupervisor {
        Supervisor::new(
            FileHandleStore::new(paths.pid_path()),
            SystemProbe,
            SystemLauncher::new(self.interrupt.clone()),
            Timeouts::from_config(config),
            self.interrupt.clone(),
        )
    }

    fn start<W: Write, E: Write>(
        &mut self,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let config = context.config;
        let name = context.service_name();
        ensure_environment(config)?;
        let paths = StatePaths::from_config(config)?;
        let plan = start_plan(config, &paths)?;
        let mut supervisor = self.supervisor(config, &paths);
        match supervisor.start(&plan)? {
            StartOutcome::AlreadyRunning { pid } => {
                output.outcome(format_args!(
                    "{name} is already running (pid {pid}) at {}",
                    config.service_endpoint()
                ))?;
                output.note(format_args!(
                    "use 'warden stop' to stop it before starting again"
                ))?;
            }
            StartOutcome::Started { pid } => {
                output.outcome(format_args!(
                    "{name} started (pid {pid}) at {}",
                    config.service_endpoint()
                ))?;
                output.note(format_args!(
                    "service output is captured in {}",
                    paths.log_path().display()
                ))?;
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    fn stop<W: Write, E: Write>(
        &mut self,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let config = context.config;
        let paths = StatePaths::from_config_readonly(config)?;
        let name = context.service_name();
        match self.supervisor(config, &paths).stop()? {
            StopOutcome::NotRunning => {
                output.outcome(format_args!("{name} is not running"))?;
            }
            StopOutcome::AlreadyExited { pid } => {
                output.outcome(format_args!(
                    "{name} (pid {pid}) had already exited; cleared its record"
                ))?;
            }
            StopOutcome::Graceful { pid } => {
                output.outcome(format_args!("{name} (pid {pid}) stopped"))?;
            }
            StopOutcome::Forced { pid } => {
                output.outcome(format_args!("{name} (pid {pid}) stopped"))?;
                output.note(format_args!(
                    "graceful shutdown timed out after {:?}; the service was killed",
                    config.stop_timeout()
                ))?;
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    fn status<W: Write, E: Write>(
        &mut self,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let config = context.config;
        let paths = StatePaths::from_config_readonly(config)?;
        let name = context.service_name();
        match self.supervisor(config, &paths).status()? {
            ServiceState::Running { pid } => {
                output.outcome(format_args!(
                    "{name} is running (pid {pid}) at {}",
                    config.service_endpoint()
                ))?;
                output.outcome(format_args!("log file: {}", paths.log_path().display()))?;
            }
            ServiceState::Stopped => {
                output.outcome(format_args!(
                    "{name} is not running; use 'warden start' to launch it"
                ))?;
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Checks what a start needs from the host before any state is touched.
fn ensure_environment(config: &Config) -> Result<(), LifecycleError> {
    if config.service_command().is_empty() {
        return Err(missing_service_command(config));
    }
    if let Some(check) = ToolchainCheck::from_config(config) {
        check.verify()?;
    }
    Ok(())
}

fn start_plan(config: &Config, paths: &StatePaths) -> Result<StartPlan, LifecycleError> {
    let launch = LaunchSpec::from_argv(
        config.service_command(),
        config.service_env(),
        paths.log_path(),
    )
    .ok_or_else(|| missing_service_command(config))?;
    Ok(StartPlan {
        launch,
        collaborators: plan_collaborators(config),
        lock_path: paths.lock_path().to_path_buf(),
    })
}

fn missing_service_command(config: &Config) -> LifecycleError {
    LifecycleError::MissingServiceCommand {
        name: config.service_name().to_owned(),
    }
}
