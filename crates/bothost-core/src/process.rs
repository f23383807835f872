//! Process handle abstraction.
//!
//! The leaf collaborator of the supervisor: spawn an executable, poll it for
//! exit without blocking, ask it to terminate, force-kill it. Handles carry no
//! ownership or concurrency rules of their own; the registry provides those.

use std::path::Path;

use bothost_types::error::SpawnError;

/// Result of a non-blocking poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    /// Exited with this code. Death by signal is reported as the negated
    /// signal number.
    Exited(i32),
}

/// A live (or recently exited) child process.
pub trait ProcessHandle: Send + 'static {
    /// OS process id, if still known.
    fn pid(&self) -> Option<u32>;

    /// Check for exit without blocking.
    fn poll(&mut self) -> std::io::Result<ProcessState>;

    /// Ask the process to exit (SIGTERM on unix).
    fn terminate(&mut self) -> std::io::Result<()>;

    /// Force the process to exit (SIGKILL on unix).
    fn kill(&mut self) -> std::io::Result<()>;
}

/// Factory for process handles.
pub trait ProcessSpawner: Send + Sync + 'static {
    type Handle: ProcessHandle;

    /// Start the executable at `path`. Returns once the OS process exists.
    fn spawn(&self, path: &Path) -> Result<Self::Handle, SpawnError>;
}
