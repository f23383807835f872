//! Child-process adapter for the supervisor.
//!
//! Bots run as `interpreter <source>` (or the source directly when no
//! interpreter is configured) with the bots directory as working directory.
//! Stdout and stderr are appended to `logs/{owner}_{name}.log`.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use bothost_core::process::{ProcessHandle, ProcessSpawner, ProcessState};
use bothost_types::error::SpawnError;
use tokio::process::{Child, Command};

/// Spawns bots with `tokio::process`.
#[derive(Debug, Clone)]
pub struct CommandSpawner {
    interpreter: Option<String>,
    work_dir: PathBuf,
    log_dir: PathBuf,
}

impl CommandSpawner {
    pub fn new(interpreter: Option<String>, work_dir: PathBuf, log_dir: PathBuf) -> Self {
        Self {
            interpreter,
            work_dir,
            log_dir,
        }
    }

    /// Log file that receives a bot's output.
    pub fn log_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bot".to_string());
        self.log_dir.join(format!("{stem}.log"))
    }
}

impl ProcessSpawner for CommandSpawner {
    type Handle = ChildHandle;

    fn spawn(&self, path: &Path) -> Result<ChildHandle, SpawnError> {
        if !path.is_file() {
            return Err(SpawnError::NotFound(path.display().to_string()));
        }

        std::fs::create_dir_all(&self.log_dir)?;
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(path))?;
        let log_err = log.try_clone()?;

        let mut command = match &self.interpreter {
            Some(interpreter) => {
                let mut c = Command::new(interpreter);
                c.arg(path);
                c
            }
            None => Command::new(path),
        };
        command
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SpawnError::NotFound(
                self.interpreter
                    .clone()
                    .unwrap_or_else(|| path.display().to_string()),
            ),
            _ => SpawnError::Io(e),
        })?;

        tracing::debug!(pid = ?child.id(), source = %path.display(), "spawned bot process");
        Ok(ChildHandle { child })
    }
}

/// A running bot process.
#[derive(Debug)]
pub struct ChildHandle {
    child: Child,
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

impl ProcessHandle for ChildHandle {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn poll(&mut self) -> io::Result<ProcessState> {
        Ok(match self.child.try_wait()? {
            Some(status) => ProcessState::Exited(exit_code(status)),
            None => ProcessState::Running,
        })
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        // Already reaped: nothing to signal.
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(io::Error::from)
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    fn kill(&mut self) -> io::Result<()> {
        match self.child.start_kill() {
            // Already exited and reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }
}
