//! Liveness probing for recorded service processes.
//!
//! A pid counts as alive only when the operating system accepts a null signal
//! for it and the process is not a zombie. Lookup failures of any kind,
//! including permission errors, are reported as "not alive".

#[cfg(unix)]
use nix::sys::signal::kill;
#[cfg(unix)]
use nix::unistd::Pid;

/// Answers whether a process identifier refers to a live process.
#[cfg_attr(test, mockall::automock)]
pub trait LivenessProbe {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Probe backed by the host operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl LivenessProbe for SystemProbe {
    #[cfg(unix)]
    fn is_alive(&self, pid: u32) -> bool {
        let Some(target) = signal_target(pid) else {
            return false;
        };
        if kill(target, None).is_err() {
            return false;
        }
        !is_defunct(pid)
    }

    #[cfg(not(unix))]
    fn is_alive(&self, _pid: u32) -> bool {
        false
    }
}

/// Converts a recorded pid into a signal target.
///
/// Zero would address the caller's own process group and values above
/// `i32::MAX` wrap to negative group identifiers, so both are rejected.
#[cfg(unix)]
pub(crate) fn signal_target(pid: u32) -> Option<Pid> {
    i32::try_from(pid)
        .ok()
        .filter(|raw| *raw > 0)
        .map(Pid::from_raw)
}

#[cfg(target_os = "linux")]
fn is_defunct(pid: u32) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/status"))
        .ok()
        .and_then(|status| process_state(&status))
        .is_some_and(|state| matches!(state, 'Z' | 'X' | 'x'))
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_defunct(pid: u32) -> bool {
    std::process::Command::new("ps")
        .args(["-o", "stat=", "-p", &pid.to_string()])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .is_some_and(|output| String::from_utf8_lossy(&output.stdout).trim_start().starts_with('Z'))
}

/// Extracts the single-letter state code from a `/proc/<pid>/status` body.
#[cfg(any(target_os = "linux", test))]
fn process_state(status: &str) -> Option<char> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("State:"))
        .and_then(|rest| rest.trim_start().chars().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Name:\tsleep\nState:\tS (sleeping)\nPid:\t42\n", Some('S'))]
    #[case("Name:\tdotnet\nState:\tZ (zombie)\n", Some('Z'))]
    #[case("Name:\tgone\n", None)]
    fn reads_state_code(#[case] status: &str, #[case] expected: Option<char>) {
        assert_eq!(process_state(status), expected);
    }

    #[cfg(unix)]
    #[rstest]
    #[case(0)]
    #[case(u32::MAX)]
    #[case(i32::MAX as u32 + 1)]
    fn rejects_unaddressable_pids(#[case] pid: u32) {
        assert!(signal_target(pid).is_none());
        assert!(!SystemProbe.is_alive(pid));
    }

    #[cfg(unix)]
    #[test]
    fn current_process_is_alive() {
        assert!(SystemProbe.is_alive(std::process::id()));
    }

    #[cfg(unix)]
    #[test]
    fn reaped_child_is_not_alive() {
        let mut child = std::process::Command::new("true")
            .spawn()
            .expect("spawn short-lived child");
        let pid = child.id();
        child.wait().expect("reap child");
        assert!(!SystemProbe.is_alive(pid));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn zombie_child_is_not_alive() {
        let mut child = std::process::Command::new("true")
            .spawn()
            .expect("spawn short-lived child");
        let pid = child.id();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while SystemProbe.is_alive(pid) && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(!SystemProbe.is_alive(pid), "exited child should read as defunct");
        child.wait().expect("reap child");
    }
}
