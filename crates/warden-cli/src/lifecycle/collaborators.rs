//! External collaborators invoked around a start transition.
//!
//! Collaborators are opaque programs: the controller only learns whether they
//! succeeded. The asset compiler runs once per configured job and then the
//! build executor runs, all before the service is spawned. Each child is
//! polled rather than waited on so that an interrupt stops it promptly.

use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::{debug, info};
use warden_config::{AssetJob, Config};

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::interrupt::{InterruptFlag, POLL_INTERVAL};

/// Errors raised by external collaborators.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("failed to launch {name} '{program}': {source}")]
    Launch {
        name: &'static str,
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{name} '{program}' failed ({status})")]
    Failed {
        name: &'static str,
        program: String,
        status: ExitStatus,
    },
    #[error("asset compiler failed for job {job} ({status}): {stderr}")]
    AssetFailed {
        job: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// A step run before the service is spawned.
pub trait Collaborator {
    /// Short human-readable label used in diagnostics.
    fn describe(&self) -> String;

    /// Runs the step to completion, killing it early if `interrupt` is raised.
    fn run(&self, interrupt: &InterruptFlag) -> Result<(), LifecycleError>;
}

/// Polls `child` until it exits, killing and reaping it on interrupt.
fn wait_interruptibly(
    child: &mut Child,
    interrupt: &InterruptFlag,
) -> Result<ExitStatus, LifecycleError> {
    let pid = child.id();
    loop {
        let status = child
            .try_wait()
            .map_err(|source| LifecycleError::MonitorChild { pid, source })?;
        if let Some(status) = status {
            return Ok(status);
        }
        if interrupt.is_raised() {
            if let Err(error) = child.kill() {
                debug!(target: LIFECYCLE_TARGET, pid, %error, "collaborator already gone");
            }
            child
                .wait()
                .map_err(|source| LifecycleError::MonitorChild { pid, source })?;
            info!(target: LIFECYCLE_TARGET, pid, "collaborator killed after interrupt");
            return Err(LifecycleError::Interrupted);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Runs the configured build command with inherited standard streams.
#[derive(Debug, Clone)]
pub struct BuildExecutor {
    program: String,
    args: Vec<String>,
}

impl BuildExecutor {
    /// Returns `None` when no build command is configured.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Collaborator for BuildExecutor {
    fn describe(&self) -> String {
        format!("build '{}'", self.program)
    }

    fn run(&self, interrupt: &InterruptFlag) -> Result<(), LifecycleError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| CollaboratorError::Launch {
                name: "build executor",
                program: self.program.clone(),
                source,
            })?;
        let status = wait_interruptibly(&mut child, interrupt)?;
        if status.success() {
            Ok(())
        } else {
            Err(CollaboratorError::Failed {
                name: "build executor",
                program: self.program.clone(),
                status,
            }
            .into())
        }
    }
}

/// Runs the static asset compiler for one job inside the job's directory.
#[derive(Debug, Clone)]
pub struct AssetCompiler {
    binary: PathBuf,
    args: Vec<String>,
    job: AssetJob,
}

impl AssetCompiler {
    pub fn new(binary: &Path, args: &[String], job: AssetJob) -> Self {
        Self {
            binary: resolve_binary(binary),
            args: args.to_vec(),
            job,
        }
    }
}

impl Collaborator for AssetCompiler {
    fn describe(&self) -> String {
        format!("assets {}", self.job)
    }

    fn run(&self, interrupt: &InterruptFlag) -> Result<(), LifecycleError> {
        let launch_error = |source: io::Error| CollaboratorError::Launch {
            name: "asset compiler",
            program: self.binary.display().to_string(),
            source,
        };
        // Spooled to a file so a chatty compiler cannot fill a pipe while polled.
        let mut stderr = tempfile::tempfile().map_err(launch_error)?;
        let child_stderr = stderr.try_clone().map_err(launch_error)?;
        let mut child = Command::new(&self.binary)
            .arg("-i")
            .arg(&self.job.input)
            .arg("-o")
            .arg(&self.job.output)
            .args(&self.args)
            .current_dir(&self.job.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(child_stderr))
            .spawn()
            .map_err(launch_error)?;
        let status = wait_interruptibly(&mut child, interrupt)?;
        if status.success() {
            return Ok(());
        }
        let mut captured = Vec::new();
        if let Err(error) = stderr
            .rewind()
            .and_then(|()| stderr.read_to_end(&mut captured))
        {
            debug!(target: LIFECYCLE_TARGET, %error, "could not read asset compiler stderr");
        }
        Err(CollaboratorError::AssetFailed {
            job: self.job.to_string(),
            status,
            stderr: String::from_utf8_lossy(&captured).trim().to_owned(),
        }
        .into())
    }
}

/// Relative binaries with a directory component would otherwise resolve
/// against the job's working directory once it is applied.
fn resolve_binary(binary: &Path) -> PathBuf {
    if binary.is_absolute() || binary.components().count() < 2 {
        return binary.to_path_buf();
    }
    std::path::absolute(binary).unwrap_or_else(|_| binary.to_path_buf())
}

/// Builds the ordered collaborator list for a start: asset jobs first, then
/// the build executor.
pub fn plan_collaborators(config: &Config) -> Vec<Box<dyn Collaborator>> {
    let mut steps: Vec<Box<dyn Collaborator>> = Vec::new();
    if let Some(binary) = config.asset_compiler() {
        for job in config.asset_jobs() {
            steps.push(Box::new(AssetCompiler::new(
                binary,
                config.asset_compiler_args(),
                job.clone(),
            )));
        }
    }
    if let Some(build) = BuildExecutor::from_argv(config.build_command()) {
        steps.push(Box::new(build));
    }
    steps
}

/// Verifies that the configured toolchain is installed and recent enough.
#[derive(Debug, Clone)]
pub struct ToolchainCheck {
    program: String,
    minimum: Option<String>,
}

impl ToolchainCheck {
    pub fn from_config(config: &Config) -> Option<Self> {
        config.toolchain().map(|program| Self {
            program: program.to_owned(),
            minimum: config.toolchain_min_version().map(str::to_owned),
        })
    }

    /// Runs `<toolchain> --version` and returns the reported version.
    pub fn verify(&self) -> Result<String, LifecycleError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| LifecycleError::ToolchainMissing {
                program: self.program.clone(),
                source,
            })?;
        let text = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if !output.status.success() {
            return Err(LifecycleError::ToolchainMissing {
                program: self.program.clone(),
                source: io::Error::other(format!("'--version' exited with {}", output.status)),
            });
        }
        let Some(required) = self.minimum.as_deref() else {
            return Ok(text);
        };
        let version_error = |output: &str| LifecycleError::ToolchainVersion {
            program: self.program.clone(),
            output: output.to_owned(),
        };
        let found = major_minor(&text).ok_or_else(|| version_error(&text))?;
        let wanted = major_minor(required).ok_or_else(|| version_error(required))?;
        if found < wanted {
            return Err(LifecycleError::ToolchainTooOld {
                program: self.program.clone(),
                found: text,
                required: required.to_owned(),
            });
        }
        info!(
            target: LIFECYCLE_TARGET,
            program = %self.program,
            version = %text,
            "toolchain satisfied"
        );
        Ok(text)
    }
}

/// Parses the leading `major.minor` pair from a version string.
fn major_minor(version: &str) -> Option<(u64, u64)> {
    let token = version.split_whitespace().find(|word| {
        word.trim_start_matches('v')
            .starts_with(|c: char| c.is_ascii_digit())
    })?;
    let mut parts = token.trim_start_matches('v').split(['.', '-', '+']);
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().map_or(Some(0), |part| part.parse().ok())?;
    Some((major, minor))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    #[rstest]
    #[case("10.0.100", Some((10, 0)))]
    #[case("8.0.404\n", Some((8, 0)))]
    #[case("rustc 1.88.0 (6b00bc388 2025-06-23)", Some((1, 88)))]
    #[case("v20.11.1", Some((20, 11)))]
    #[case("9", Some((9, 0)))]
    #[case("unknown", None)]
    fn parses_major_minor(#[case] version: &str, #[case] expected: Option<(u64, u64)>) {
        assert_eq!(major_minor(version), expected);
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| (*part).to_owned()).collect()
    }

    #[test]
    fn empty_build_command_is_skipped() {
        assert!(BuildExecutor::from_argv(&[]).is_none());
    }

    #[test]
    fn failing_build_is_reported() {
        let build = BuildExecutor::from_argv(&argv(&["false"])).expect("build configured");
        assert!(matches!(
            build.run(&InterruptFlag::new()),
            Err(LifecycleError::Collaborator(CollaboratorError::Failed { .. }))
        ));
    }

    #[test]
    fn successful_build_passes() {
        let build = BuildExecutor::from_argv(&argv(&["true"])).expect("build configured");
        build.run(&InterruptFlag::new()).expect("build succeeds");
    }

    #[test]
    fn missing_build_program_fails_to_launch() {
        let build = BuildExecutor::from_argv(&argv(&["warden-test-no-such-build"]))
            .expect("build configured");
        assert!(matches!(
            build.run(&InterruptFlag::new()),
            Err(LifecycleError::Collaborator(CollaboratorError::Launch { .. }))
        ));
    }

    #[test]
    fn interrupt_stops_a_running_build() {
        let build = BuildExecutor::from_argv(&argv(&["sleep", "30"])).expect("build configured");
        let interrupt = InterruptFlag::new();
        let raiser = interrupt.clone();
        let signaller = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(300));
            raiser.raise();
        });

        let started = std::time::Instant::now();
        let result = build.run(&interrupt);
        signaller.join().expect("raiser thread");

        assert!(matches!(result, Err(LifecycleError::Interrupted)));
        assert!(
            started.elapsed() < std::time::Duration::from_secs(5),
            "build should be killed promptly, took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn interrupt_stops_a_running_asset_job() {
        let dir = TempDir::new().expect("temp dir");
        let compiler = write_script(dir.path(), "compiler", "#!/bin/sh
exec sleep 30
");
        let job = AssetJob::new(dir.path(), "in.css", "out.css");
        let interrupt = InterruptFlag::new();
        interrupt.raise();

        let started = std::time::Instant::now();
        let result = AssetCompiler::new(&compiler, &[], job).run(&interrupt);

        assert!(matches!(result, Err(LifecycleError::Interrupted)));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, body).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    #[test]
    fn asset_compiler_runs_in_job_directory() {
        let dir = TempDir::new().expect("temp dir");
        let workdir = dir.path().join("web");
        fs::create_dir(&workdir).expect("create workdir");
        let compiler = write_script(
            dir.path(),
            "compiler",
            "#!/bin/sh\necho \"$@\" > \"$4\"\n",
        );
        let job = AssetJob::new(&workdir, "app.css", "app.min.css");

        AssetCompiler::new(&compiler, &argv(&["--minify"]), job)
            .run(&InterruptFlag::new())
            .expect("asset job succeeds");

        let written = fs::read_to_string(workdir.join("app.min.css")).expect("output written");
        assert_eq!(written.trim(), "-i app.css -o app.min.css --minify");
    }

    #[test]
    fn asset_compiler_failure_carries_stderr() {
        let dir = TempDir::new().expect("temp dir");
        let compiler = write_script(
            dir.path(),
            "compiler",
            "#!/bin/sh\necho 'unknown utility class' >&2\nexit 3\n",
        );
        let job = AssetJob::new(dir.path(), "in.css", "out.css");

        let error = AssetCompiler::new(&compiler, &[], job)
            .run(&InterruptFlag::new())
            .expect_err("asset job fails");
        match error {
            LifecycleError::Collaborator(CollaboratorError::AssetFailed { stderr, .. }) => {
                assert_eq!(stderr, "unknown utility class");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn plan_orders_assets_before_build() {
        let config = Config {
            asset_compiler: Some(PathBuf::from("tailwindcss")),
            asset_jobs: vec![
                AssetJob::new("a", "in.css", "out.css"),
                AssetJob::new("b", "in.css", "out.css"),
            ],
            build_command: argv(&["dotnet", "build"]),
            ..Config::default()
        };
        let labels: Vec<String> = plan_collaborators(&config)
            .iter()
            .map(|step| step.describe())
            .collect();
        assert_eq!(
            labels,
            [
                "assets a,in.css,out.css",
                "assets b,in.css,out.css",
                "build 'dotnet'"
            ]
        );
    }

    #[test]
    fn asset_jobs_need_a_compiler() {
        let config = Config {
            asset_jobs: vec![AssetJob::new("a", "in.css", "out.css")],
            ..Config::default()
        };
        assert!(plan_collaborators(&config).is_empty());
    }

    #[rstest]
    #[case("#!/bin/sh\necho 8.0.404\n", Some("8.0"), true)]
    #[case("#!/bin/sh\necho 10.0.100\n", Some("8.0"), true)]
    #[case("#!/bin/sh\necho 7.0.1\n", Some("8.0"), false)]
    #[case("#!/bin/sh\necho 7.0.1\n", None, true)]
    #[case("#!/bin/sh\nexit 1\n", None, false)]
    fn toolchain_version_gate(
        #[case] script: &str,
        #[case] minimum: Option<&str>,
        #[case] accepted: bool,
    ) {
        let dir = TempDir::new().expect("temp dir");
        let tool = write_script(dir.path(), "toolchain", script);
        let check = ToolchainCheck {
            program: tool.display().to_string(),
            minimum: minimum.map(str::to_owned),
        };
        assert_eq!(check.verify().is_ok(), accepted);
    }

    #[test]
    fn missing_toolchain_is_an_environment_error() {
        let check = ToolchainCheck {
            program: String::from("warden-test-no-such-toolchain"),
            minimum: None,
        };
        assert!(matches!(
            check.verify(),
            Err(LifecycleError::ToolchainMissing { .. })
        ));
    }
}
