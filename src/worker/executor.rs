//! Isolated executor - runs the visit operation in a killable child process
//!
//! The browser may hang in ways that ignore any cooperative cancellation, so
//! the visit runs in its own process group and the hard timeout is enforced by
//! killing that whole group, Chrome included.

use crate::browser::VisitOptions;
use crate::error::{Result, RobotaskError};
use crate::task::ExecutionOutcome;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Runs one visit under supervision
#[async_trait]
pub trait Executor: Send + Sync {
    /// Visit `url`, bounded by `hard_timeout`.
    ///
    /// `Err` means the execution context could not be started at all.
    async fn execute(
        &self,
        url: &str,
        hard_timeout: Duration,
        env: &[(String, String)],
    ) -> Result<ExecutionOutcome>;
}

/// Executor spawning `<program> <args...> <url>` per visit
#[derive(Debug, Clone)]
pub struct IsolatedExecutor {
    program: PathBuf,
    args: Vec<String>,
}

impl IsolatedExecutor {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Executor re-running the current binary's `visit` subcommand
    pub fn for_visit(options: &VisitOptions, log_file: Option<&Path>, verbose: bool) -> Result<Self> {
        let program = std::env::current_exe()?;

        let mut args = Vec::new();
        if verbose {
            args.push("--verbose".to_string());
        }
        if let Some(path) = log_file {
            args.push("--log-file".to_string());
            args.push(path.display().to_string());
        }
        args.push("visit".to_string());
        args.extend(options.to_args());

        Ok(Self::new(program, args))
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl Executor for IsolatedExecutor {
    async fn execute(
        &self,
        url: &str,
        hard_timeout: Duration,
        env: &[(String, String)],
    ) -> Result<ExecutionOutcome> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(url)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| RobotaskError::Launch {
            program: self.program.display().to_string(),
            source,
        })?;
        let pid = child.id();
        debug!("Spawned execution context pid={:?} for {}", pid, url);

        let outcome = match tokio::time::timeout(hard_timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => ExecutionOutcome::Completed,
            Ok(Ok(status)) => ExecutionOutcome::Crashed(describe_exit(status)),
            Ok(Err(e)) => ExecutionOutcome::Crashed(format!("failed to wait for child: {}", e)),
            Err(_) => {
                warn!(
                    "Visit of {} exceeded hard timeout {:?}, killing execution context",
                    url, hard_timeout
                );
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                if let Err(e) = child.kill().await {
                    error!("Failed to kill execution context: {}", e);
                }
                ExecutionOutcome::TimedOut
            }
        };

        // Whatever happened, nothing started for this visit may outlive it
        if let Some(pid) = pid {
            kill_process_group(pid);
        }

        info!("Execution of {} finished: {}", url, outcome.as_str());
        Ok(outcome)
    }
}

fn describe_exit(status: ExitStatus) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("killed by signal {}", signal);
        }
    }
    match status.code() {
        Some(code) => format!("exited with status {}", code),
        None => "exited abnormally".to_string(),
    }
}

/// SIGKILL every process in the group led by `pid`.
///
/// ESRCH (group already gone) is the common case after a clean exit.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    // SAFETY: the group was created by us via process_group(0), so its id is
    // the pid of our own child.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc == 0 {
        debug!("Killed process group {}", pid);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
