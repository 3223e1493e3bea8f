//! The start/stop/status state machine.
//!
//! The service is either STOPPED (no live handle) or RUNNING (a persisted
//! handle whose process answers the liveness probe). Every command first
//! reconciles the record with reality through
//! [`HandleStore::load_validated`], then performs at most one transition.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};
use warden_config::Config;

use super::LIFECYCLE_TARGET;
use super::collaborators::Collaborator;
use super::error::LifecycleError;
use super::interrupt::InterruptFlag;
use super::lock::StartLock;
use super::probe::LivenessProbe;
use super::process::{LaunchSpec, ProcessHandle, ProcessLauncher, SignalDelivery};
use super::store::{HandleStore, ServiceHandle};

/// Observed service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Running { pid: u32 },
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    AlreadyRunning { pid: u32 },
    Started { pid: u32 },
}

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    /// The process vanished before it could be signalled.
    AlreadyExited { pid: u32 },
    Graceful { pid: u32 },
    Forced { pid: u32 },
}

/// Bounded waits applied by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub startup_grace: Duration,
    pub graceful_stop: Duration,
    pub forceful_stop: Duration,
}

impl Timeouts {
    pub const fn from_config(config: &Config) -> Self {
        Self {
            startup_grace: config.startup_grace(),
            graceful_stop: config.stop_timeout(),
            forceful_stop: config.kill_timeout(),
        }
    }
}

/// Inputs specific to a start transition.
pub struct StartPlan {
    pub launch: LaunchSpec,
    pub collaborators: Vec<Box<dyn Collaborator>>,
    pub lock_path: PathBuf,
}

/// Drives lifecycle transitions over injectable store, probe, and launcher.
pub struct Supervisor<S, P, L> {
    store: S,
    probe: P,
    launcher: L,
    timeouts: Timeouts,
    interrupt: InterruptFlag,
}

impl<S, P, L> Supervisor<S, P, L>
where
    S: HandleStore,
    P: LivenessProbe,
    L: ProcessLauncher,
{
    pub fn new(store: S, probe: P, launcher: L, timeouts: Timeouts, interrupt: InterruptFlag) -> Self {
        Self {
            store,
            probe,
            launcher,
            timeouts,
            interrupt,
        }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// Reports whether a live service is recorded.
    pub fn status(&self) -> Result<ServiceState, LifecycleError> {
        Ok(match self.store.load_validated(&self.probe)? {
            Some(handle) => ServiceState::Running { pid: handle.pid() },
            None => ServiceState::Stopped,
        })
    }

    /// Starts the service unless a live instance is already recorded.
    pub fn start(&mut self, plan: &StartPlan) -> Result<StartOutcome, LifecycleError> {
        let pid = {
            let _lock = StartLock::acquire(&plan.lock_path)?;
            if let Some(handle) = self.store.load_validated(&self.probe)? {
                info!(target: LIFECYCLE_TARGET, pid = handle.pid(), "service already running");
                return Ok(StartOutcome::AlreadyRunning { pid: handle.pid() });
            }
            for step in &plan.collaborators {
                self.interrupt.check()?;
                info!(target: LIFECYCLE_TARGET, step = %step.describe(), "running collaborator");
                step.run(&self.interrupt)?;
            }
            self.interrupt.check()?;
            self.launch_and_record(&plan.launch)?
        };

        self.interrupt.sleep(self.timeouts.startup_grace)?;
        if self.probe.is_alive(pid) {
            info!(target: LIFECYCLE_TARGET, pid, "service survived startup grace");
            return Ok(StartOutcome::Started { pid });
        }
        warn!(target: LIFECYCLE_TARGET, pid, "service exited during startup grace");
        self.store.clear()?;
        Err(LifecycleError::NotAlive {
            pid,
            log: plan.launch.log_path.clone(),
        })
    }

    fn launch_and_record(&mut self, launch: &LaunchSpec) -> Result<u32, LifecycleError> {
        let mut process = self.launcher.spawn(launch)?;
        let pid = process.pid();
        let recorded = ServiceHandle::new(pid)
            .ok_or(LifecycleError::InvalidPid {
                pid,
                reason: "spawned process reported an unusable pid",
            })
            .and_then(|handle| self.store.save(handle).map_err(LifecycleError::from));
        if let Err(error) = recorded {
            warn!(
                target: LIFECYCLE_TARGET,
                pid,
                error = %error,
                "could not record spawned service; terminating it"
            );
            if let Err(kill_error) = process.send_forceful() {
                warn!(target: LIFECYCLE_TARGET, pid, error = %kill_error, "rollback kill failed");
            }
            return Err(error);
        }
        Ok(pid)
    }

    /// Stops the recorded service, escalating to a forceful stop when the
    /// graceful timeout expires.
    pub fn stop(&mut self) -> Result<StopOutcome, LifecycleError> {
        let Some(handle) = self.store.load_validated(&self.probe)? else {
            return Ok(StopOutcome::NotRunning);
        };
        let pid = handle.pid();
        let mut process = self.launcher.attach(pid);

        if process.send_graceful()? == SignalDelivery::AlreadyExited {
            self.store.clear()?;
            return Ok(StopOutcome::AlreadyExited { pid });
        }
        if process.wait(self.timeouts.graceful_stop)? {
            self.store.clear()?;
            info!(target: LIFECYCLE_TARGET, pid, "service stopped gracefully");
            return Ok(StopOutcome::Graceful { pid });
        }

        warn!(
            target: LIFECYCLE_TARGET,
            pid,
            timeout = ?self.timeouts.graceful_stop,
            "graceful stop timed out; escalating"
        );
        process.send_forceful()?;
        if process.wait(self.timeouts.forceful_stop)? {
            self.store.clear()?;
            return Ok(StopOutcome::Forced { pid });
        }
        Err(LifecycleError::StopTimeout {
            pid,
            timeout: self.timeouts.graceful_stop + self.timeouts.forceful_stop,
        })
    }
}
