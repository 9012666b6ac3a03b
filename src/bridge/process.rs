//! Worker process spawning and control.
//!
//! A worker is started as `<program> <leading args...> <command> [arg...]`
//! with both output streams piped. On Unix each worker leads its own
//! process group so termination reaches anything it forked.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use super::invocation::CommandInvocation;
use super::output::ProcessOutcome;

/// Environment that forces UTF-8 on the worker's standard streams.
pub const UTF8_ENV: [(&str, &str); 4] = [
    ("PYTHONIOENCODING", "utf-8"),
    ("PYTHONUTF8", "1"),
    ("LC_ALL", "C.UTF-8"),
    ("LANG", "C.UTF-8"),
];

/// Error type for process spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The program was not found.
    #[error("Worker program '{program}' not found")]
    NotFound { program: String },
    /// Permission denied when spawning.
    #[error("Permission denied running '{program}'")]
    PermissionDenied { program: String },
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    fn from_io(program: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound {
                program: program.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                program: program.to_string(),
            },
            _ => Self::Io(err),
        }
    }
}

/// How to launch the worker program.
#[derive(Debug, Clone, Default)]
pub struct WorkerLaunch {
    program: String,
    leading_args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl WorkerLaunch {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Arguments placed before the command name, e.g. the script path.
    #[must_use]
    pub fn leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Extra environment; applied after the UTF-8 defaults so it can override them.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument vector for one invocation.
    #[must_use]
    pub fn build_args(&self, invocation: &CommandInvocation) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend(invocation.build_args());
        args
    }
}

/// A running worker process.
#[derive(Debug)]
pub struct WorkerProcess {
    child: Child,
    /// Pid at spawn time; on Unix also the process group id.
    spawned_pid: Option<u32>,
}

impl WorkerProcess {
    /// Spawn a worker for `invocation`.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the process fails to spawn.
    pub fn spawn(launch: &WorkerLaunch, invocation: &CommandInvocation) -> Result<Self, SpawnError> {
        let mut cmd = Command::new(&launch.program);
        cmd.args(launch.build_args(invocation))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in UTF8_ENV {
            cmd.env(key, value);
        }
        for (key, value) in &launch.env {
            cmd.env(key, value);
        }

        if let Some(ref dir) = launch.working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .map_err(|e| SpawnError::from_io(&launch.program, e))?;

        let spawned_pid = child.id();
        Ok(Self { child, spawned_pid })
    }

    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Drain stdout and stderr while waiting for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if reading a stream or waiting fails.
    pub async fn collect(&mut self) -> std::io::Result<ProcessOutcome> {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let exit_code = self.collect_into(&mut out, &mut err).await?;
        Ok(ProcessOutcome::from_raw(exit_code, &out, &err))
    }

    /// Read both pipes into caller-owned buffers until the process exits.
    ///
    /// Both pipes are read concurrently with `wait` so a chatty worker
    /// cannot block on a full pipe buffer. If this future is dropped early
    /// the buffers keep whatever had been read so far.
    ///
    /// # Errors
    ///
    /// Returns an error if reading a stream or waiting fails.
    pub async fn collect_into(
        &mut self,
        out: &mut Vec<u8>,
        err: &mut Vec<u8>,
    ) -> std::io::Result<Option<i32>> {
        let mut stdout = self.child.stdout.take();
        let mut stderr = self.child.stderr.take();

        let read_out = async {
            if let Some(pipe) = stdout.as_mut() {
                pipe.read_to_end(out).await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let read_err = async {
            if let Some(pipe) = stderr.as_mut() {
                pipe.read_to_end(err).await?;
            }
            Ok::<_, std::io::Error>(())
        };

        let (read_out, read_err, status) = tokio::join!(read_out, read_err, self.child.wait());
        read_out?;
        read_err?;
        Ok(status?.code())
    }

    /// Forcefully kill the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    pub async fn kill(&mut self) -> std::io::Result<()> {
        self.child.kill().await
    }

    /// Terminate the worker and everything in its process group.
    ///
    /// On Unix, sends SIGTERM to the group first, then SIGKILL after the
    /// grace period. On other platforms, falls back to immediate kill.
    ///
    /// # Errors
    ///
    /// Returns an error if termination fails.
    pub async fn terminate(&mut self, grace: Duration) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            self.terminate_group_unix(grace).await
        }

        #[cfg(not(unix))]
        {
            let _ = grace;
            self.kill().await
        }
    }

    #[cfg(unix)]
    async fn terminate_group_unix(&mut self, grace: Duration) -> std::io::Result<()> {
        use nix::sys::signal::{killpg, Signal};

        // The leader may already be reaped while children it forked still
        // hold the pipes open, so signal the group recorded at spawn time.
        let Some(group) = process_group(self.spawned_pid) else {
            tracing::warn!(pid = ?self.spawned_pid, "No process group to signal, killing worker only");
            return self.child.kill().await;
        };
        let pid = group.as_raw();
        let _ = killpg(group, Signal::SIGTERM);

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(_)) => {
                // Leader is gone; make sure no stragglers kept the group alive
                let _ = killpg(group, Signal::SIGKILL);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!(pid, "Worker ignored SIGTERM, sending SIGKILL");
                let _ = killpg(group, Signal::SIGKILL);
                self.child.kill().await
            }
        }
    }
}

/// Group id to signal for a worker spawned as `pid`.
///
/// A pid that does not fit a positive `i32` yields `None`; signalling group 0
/// or a clamped id would hit the wrong processes.
#[cfg(unix)]
fn process_group(pid: Option<u32>) -> Option<nix::unistd::Pid> {
    let raw = i32::try_from(pid?).ok().filter(|raw| *raw > 0)?;
    Some(nix::unistd::Pid::from_raw(raw))
}
