//! Cooperative interrupt handling for foreground lifecycle waits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use signal_hook::consts::signal::{SIGINT, SIGTERM};

use super::error::LifecycleError;

/// Granularity of interruptible sleeps and process polling.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Flag raised when the controller receives SIGINT or SIGTERM.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    /// Creates a flag with no signal handlers attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flag raised by SIGINT and SIGTERM.
    pub fn install() -> Result<Self, LifecycleError> {
        let flag = Self::new();
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&flag.raised))
                .map_err(LifecycleError::InstallSignals)?;
        }
        Ok(flag)
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Fails with [`LifecycleError::Interrupted`] once the flag is raised.
    pub fn check(&self) -> Result<(), LifecycleError> {
        if self.is_raised() {
            Err(LifecycleError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `duration`, waking early to report an interrupt.
    pub fn sleep(&self, duration: Duration) -> Result<(), LifecycleError> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            thread::sleep(remaining.min(POLL_INTERVAL));
        }
    }
}
