//! Spawning, signalling, and waiting on the supervised service.
//!
//! The service is launched in its own session so that it survives the
//! controller and so that signals can address the whole process group,
//! including any grandchildren a launcher wrapper such as `dotnet run`
//! forks.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info};
use warden_config::EnvAssignment;

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::interrupt::{InterruptFlag, POLL_INTERVAL};
use super::probe::{LivenessProbe, SystemProbe};

/// Result of delivering a termination signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDelivery {
    Delivered,
    AlreadyExited,
}

/// Control surface over a running service process.
pub trait ProcessHandle {
    fn pid(&self) -> u32;

    /// Requests a graceful shutdown.
    fn send_graceful(&mut self) -> Result<SignalDelivery, LifecycleError>;

    /// Terminates the process unconditionally.
    fn send_forceful(&mut self) -> Result<SignalDelivery, LifecycleError>;

    /// Waits up to `timeout` for the process to exit, returning whether it did.
    fn wait(&mut self, timeout: Duration) -> Result<bool, LifecycleError>;
}

/// Everything needed to launch the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<EnvAssignment>,
    pub log_path: PathBuf,
}

impl LaunchSpec {
    /// Builds a spec from an argv, returning `None` when it is empty.
    pub fn from_argv(argv: &[String], env: &[EnvAssignment], log_path: &Path) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            env: env.to_vec(),
            log_path: log_path.to_path_buf(),
        })
    }
}

/// Creates and reattaches to service processes.
pub trait ProcessLauncher {
    type Handle: ProcessHandle;

    /// Launches the service detached from the controller.
    fn spawn(&self, spec: &LaunchSpec) -> Result<Self::Handle, LifecycleError>;

    /// Rebuilds a handle for a process started by an earlier invocation.
    fn attach(&self, pid: u32) -> Self::Handle;
}

/// Launcher backed by the host operating system.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher {
    interrupt: InterruptFlag,
}

impl SystemLauncher {
    pub fn new(interrupt: InterruptFlag) -> Self {
        Self { interrupt }
    }
}

impl ProcessLauncher for SystemLauncher {
    type Handle = SystemProcess;

    fn spawn(&self, spec: &LaunchSpec) -> Result<Self::Handle, LifecycleError> {
        let log = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&spec.log_path)
            .map_err(|source| LifecycleError::OpenLog {
                path: spec.log_path.clone(),
                source,
            })?;
        let log_for_stderr = log.try_clone().map_err(|source| LifecycleError::OpenLog {
            path: spec.log_path.clone(),
            source,
        })?;

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|entry| (&entry.key, &entry.value)))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_for_stderr));
        detach(&mut command)?;

        let child = command.spawn().map_err(|source| LifecycleError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        info!(
            target: LIFECYCLE_TARGET,
            pid = child.id(),
            program = %spec.program,
            log = %spec.log_path.display(),
            "service spawned"
        );
        Ok(SystemProcess {
            pid: child.id(),
            child: Some(child),
            interrupt: self.interrupt.clone(),
        })
    }

    fn attach(&self, pid: u32) -> Self::Handle {
        SystemProcess {
            pid,
            child: None,
            interrupt: self.interrupt.clone(),
        }
    }
}

#[cfg(unix)]
fn detach(command: &mut Command) -> Result<(), LifecycleError> {
    use std::os::unix::process::CommandExt;

    // SAFETY: setsid(2) is async-signal-safe and the closure neither
    // allocates nor touches shared state between fork and exec.
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid()
                .map(drop)
                .map_err(io::Error::from)
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) -> Result<(), LifecycleError> {
    Err(LifecycleError::UnsupportedPlatform)
}

/// A service process owned by this invocation or attached by pid.
#[derive(Debug)]
pub struct SystemProcess {
    pid: u32,
    child: Option<Child>,
    interrupt: InterruptFlag,
}

impl SystemProcess {
    fn has_exited(&mut self) -> Result<bool, LifecycleError> {
        if let Some(child) = self.child.as_mut() {
            return child
                .try_wait()
                .map(|status| status.is_some())
                .map_err(|source| LifecycleError::MonitorChild {
                    pid: self.pid,
                    source,
                });
        }
        Ok(!SystemProbe.is_alive(self.pid))
    }

    #[cfg(unix)]
    fn signal(&self, signal: nix::sys::signal::Signal) -> Result<SignalDelivery, LifecycleError> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, killpg};

        let target = super::probe::signal_target(self.pid).ok_or(LifecycleError::InvalidPid {
            pid: self.pid,
            reason: "pid cannot be addressed by a signal",
        })?;
        let result = killpg(target, signal).or_else(|group_error| {
            debug!(
                target: LIFECYCLE_TARGET,
                pid = self.pid,
                error = %group_error,
                "process group signal failed; signalling pid directly"
            );
            kill(target, signal)
        });
        match result {
            Ok(()) => {
                debug!(target: LIFECYCLE_TARGET, pid = self.pid, %signal, "signal delivered");
                Ok(SignalDelivery::Delivered)
            }
            Err(Errno::ESRCH) => Ok(SignalDelivery::AlreadyExited),
            Err(errno) => Err(LifecycleError::SignalFailed {
                pid: self.pid,
                source: io::Error::from(errno),
            }),
        }
    }
}

impl ProcessHandle for SystemProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    #[cfg(unix)]
    fn send_graceful(&mut self) -> Result<SignalDelivery, LifecycleError> {
        self.signal(nix::sys::signal::Signal::SIGTERM)
    }

    #[cfg(not(unix))]
    fn send_graceful(&mut self) -> Result<SignalDelivery, LifecycleError> {
        Err(LifecycleError::UnsupportedPlatform)
    }

    #[cfg(unix)]
    fn send_forceful(&mut self) -> Result<SignalDelivery, LifecycleError> {
        self.signal(nix::sys::signal::Signal::SIGKILL)
    }

    #[cfg(not(unix))]
    fn send_forceful(&mut self) -> Result<SignalDelivery, LifecycleError> {
        Err(LifecycleError::UnsupportedPlatform)
    }

    fn wait(&mut self, timeout: Duration) -> Result<bool, LifecycleError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.has_exited()? {
                return Ok(true);
            }
            self.interrupt.check()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            std::thread::sleep(remaining.min(POLL_INTERVAL));
        }
    }
}
