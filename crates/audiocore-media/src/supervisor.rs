//! Spawns and supervises the external transcoder subprocess.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use audiocore_data::JobId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{instrument, warn};

use crate::error::{MediaError, Result};

/// Grace period given to a child after a graceful-terminate signal before
/// it is force-killed.
const GRACEFUL_TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout applied to the `--version` readiness probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A running transcoder process and its detached stdio handles.
pub struct ChildHandle {
    child: Child,
    /// Writable end of the child's stdin.
    pub stdin: Option<ChildStdin>,
    /// Readable end of the child's stdout.
    pub stdout: Option<ChildStdout>,
    /// Readable end of the child's stderr.
    pub stderr: Option<ChildStderr>,
}

impl ChildHandle {
    /// Wrap a freshly-spawned child, taking ownership of its stdio pipes.
    fn from_spawned(mut child: Child) -> Self {
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        Self {
            child,
            stdin,
            stdout,
            stderr,
        }
    }

    /// Wrap the child's stderr in a line reader, for the progress parser to consume.
    ///
    /// # Panics
    ///
    /// Panics if called more than once or after the stderr handle has
    /// already been taken by the caller directly.
    pub fn stderr_lines(&mut self) -> tokio::io::Lines<BufReader<ChildStderr>> {
        let stderr = self.stderr.take().expect("stderr already taken");
        BufReader::new(stderr).lines()
    }

    /// Wait for the process to exit, returning an error on a non-zero code.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::AbnormalExit`] if the process exits with a
    /// non-zero code or is killed by a signal, and [`MediaError::Io`] if
    /// waiting itself fails.
    pub async fn wait(&mut self, job_id: &JobId) -> Result<()> {
        let status = self.child.wait().await.map_err(|source| MediaError::Io {
            operation: "wait",
            source,
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(MediaError::AbnormalExit {
                job_id: job_id.as_str().to_string(),
                code: status.code(),
            })
        }
    }
}

/// Tracks one subprocess per job and exposes graceful/hard termination.
#[derive(Clone, Default)]
pub struct Supervisor {
    processes: Arc<Mutex<HashMap<JobId, u32>>>,
    readiness: Arc<Mutex<Option<bool>>>,
}

impl Supervisor {
    /// Construct an empty supervisor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run [`Supervisor::probe_tool`] once per process lifetime and cache the
    /// result, so repeated job submissions do not re-probe the binary.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::ToolNotReady`] if the cached or fresh probe failed.
    pub async fn ensure_ready(&self, tool_path: &str) -> Result<()> {
        let cached = *self.readiness.lock().expect("supervisor mutex poisoned");
        match cached {
            Some(true) => return Ok(()),
            Some(false) => {
                return Err(MediaError::ToolNotReady {
                    tool: tool_path.to_string(),
                });
            }
            None => {}
        }

        let result = self.probe_tool(tool_path).await;
        *self.readiness.lock().expect("supervisor mutex poisoned") = Some(result.is_ok());
        result
    }

    /// Check the transcoder binary is present and responsive by invoking
    /// `<tool> --version` with a 5-second timeout.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::ToolNotReady`] if the probe fails or times out.
    #[instrument(skip(self))]
    pub async fn probe_tool(&self, tool_path: &str) -> Result<()> {
        let probe = Command::new(tool_path).arg("--version").stdin(std::process::Stdio::null()).stdout(std::process::Stdio::null()).stderr(std::process::Stdio::null()).status();

        match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            _ => Err(MediaError::ToolNotReady {
                tool: tool_path.to_string(),
            }),
        }
    }

    /// Spawn the transcoder for a job with piped stdio, tracking it by job id.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::SpawnFailed`] if the process cannot be started.
    #[instrument(skip(self, args))]
    pub fn spawn(&self, job_id: &JobId, tool_path: &str, args: &[String]) -> Result<ChildHandle> {
        let child = Command::new(tool_path)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MediaError::SpawnFailed {
                tool: tool_path.to_string(),
                source,
            })?;

        if let Some(pid) = child.id() {
            self.processes.lock().expect("supervisor mutex poisoned").insert(job_id.clone(), pid);
        }

        Ok(ChildHandle::from_spawned(child))
    }

    /// Mark a job's process as no longer tracked, once it has exited.
    pub fn forget(&self, job_id: &JobId) {
        self.processes.lock().expect("supervisor mutex poisoned").remove(job_id);
    }

    /// Terminate a tracked process: graceful signal first, hard kill after
    /// [`GRACEFUL_TERMINATE_TIMEOUT`] if it is still alive.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::NotTracked`] if no process is tracked for this job.
    #[instrument(skip(self))]
    pub async fn terminate(&self, job_id: &JobId) -> Result<()> {
        let pid = {
            let processes = self.processes.lock().expect("supervisor mutex poisoned");
            *processes.get(job_id).ok_or_else(|| MediaError::NotTracked {
                job_id: job_id.as_str().to_string(),
            })?
        };

        send_graceful_terminate(pid);
        tokio::time::sleep(GRACEFUL_TERMINATE_TIMEOUT).await;
        if process_is_alive(pid) {
            warn!(job_id = %job_id, pid, "process still alive after graceful terminate, sending hard kill");
            send_hard_kill(pid);
        }
        self.forget(job_id);
        Ok(())
    }

    /// Terminate every tracked process, for use during application shutdown.
    pub async fn cleanup_all(&self) {
        let job_ids: Vec<JobId> = self.processes.lock().expect("supervisor mutex poisoned").keys().cloned().collect();
        for job_id in job_ids {
            if let Err(err) = self.terminate(&job_id).await {
                warn!(job_id = %job_id, error = %err, "failed to terminate process during cleanup");
            }
        }
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn send_graceful_terminate(pid: u32) {
    // SAFETY: `pid` came from `Child::id`, which is a valid process id for
    // the lifetime of this call; `kill` with a valid signal number cannot
    // violate memory safety regardless of whether the process still exists.
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn send_graceful_terminate(_pid: u32) {}

#[cfg(unix)]
#[allow(unsafe_code)]
fn send_hard_kill(pid: u32) {
    // SAFETY: see `send_graceful_terminate`.
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn send_hard_kill(_pid: u32) {}

#[cfg(unix)]
#[allow(unsafe_code)]
fn process_is_alive(pid: u32) -> bool {
    // SAFETY: see `send_graceful_terminate`; signal 0 performs no action
    // beyond existence/permission checks.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn process_is_alive(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probing_a_nonexistent_tool_fails() {
        let supervisor = Supervisor::new();
        let result = supervisor.probe_tool("definitely-not-a-real-audiocore-transcoder").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn terminating_an_untracked_job_is_an_error() {
        let supervisor = Supervisor::new();
        let job_id = JobId::generate();
        let result = supervisor.terminate(&job_id).await;
        assert!(matches!(result, Err(MediaError::NotTracked { .. })));
    }
}
