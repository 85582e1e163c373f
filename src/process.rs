//! Child process execution with captured output and a hard timeout

use crate::core::error::{DispatchError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of one child process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program args...` to completion or until `timeout` expires
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<ProcessOutput>;
}

/// Runs real processes through tokio
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<ProcessOutput> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        // Own process group, so a timeout reaches grandchildren too
        #[cfg(unix)]
        command.process_group(0);

        debug!(program, ?args, "spawning");
        let child = command.spawn().map_err(|e| {
            DispatchError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to start {}: {}", program, e),
            ))
        })?;
        let pid = child.id();

        let wait = child.wait_with_output();
        tokio::pin!(wait);
        match tokio::time::timeout(timeout, &mut wait).await {
            Ok(output) => {
                let output = output?;
                Ok(ProcessOutput {
                    status: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            Err(_) => {
                // The child is not reaped yet, so its pid still names the group
                if let Some(pid) = pid {
                    kill_group(pid);
                }
                warn!(program, ?timeout, "process timed out and was killed");
                Err(DispatchError::UpstreamTimeout {
                    what: format!("Process '{}'", program),
                    after: timeout,
                })
            }
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created for this child
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        warn!(pgid, error = %std::io::Error::last_os_error(), "failed to kill process group");
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

/// Split a configured command line into program and leading arguments
pub fn split_command(parts: &[String]) -> Result<(&str, &[String])> {
    parts
        .split_first()
        .map(|(program, rest)| (program.as_str(), rest))
        .ok_or_else(|| DispatchError::Config("Empty command line".into()))
}
