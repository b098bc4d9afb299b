//! PTY (Pseudoterminal) handling
//!
//! This module owns the only OS-level fallibility in the crate: allocating
//! a master/slave pair, forking the child with the slave as its standard
//! streams, and moving bytes and window sizes across the master side.

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::{get_window_size, Pty};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("posix_openpt: {0}")]
    OpenMaster(#[source] nix::Error),

    #[error("grantpt: {0}")]
    GrantPty(#[source] nix::Error),

    #[error("unlockpt: {0}")]
    UnlockPty(#[source] nix::Error),

    #[error("ptsname: {0}")]
    PtsName(#[source] nix::Error),

    #[error("cannot open pty slave: {0}")]
    OpenSlave(#[source] nix::Error),

    #[error("fork: {0}")]
    Fork(#[source] nix::Error),

    #[error("NUL byte in command or environment: {0}")]
    InvalidArgument(#[from] std::ffi::NulError),

    #[error("cannot make pty master non-blocking: {0}")]
    SetNonBlocking(#[source] nix::Error),

    #[error("TIOCSWINSZ: {0}")]
    SetWinsize(#[source] nix::Error),

    #[error("pty read: {0}")]
    Read(#[source] nix::Error),

    #[error("pty write: {0}")]
    Write(#[source] nix::Error),

    #[error("poll: {0}")]
    Poll(#[source] nix::Error),

    #[error("waitpid: {0}")]
    Wait(#[source] nix::Error),

    #[error("kill: {0}")]
    Signal(#[source] nix::Error),

    #[error("pty was destroyed")]
    Destroyed,
}

pub type PtyResult<T> = Result<T, PtyError>;

/// Mirrors `struct winsize`; `new` takes columns first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
    pub pixel_width: u16,
    pub pixel_height: u16,
}

impl WindowSize {
    /// No pixel dimensions
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }

    /// Window size for a grid, saturating at the kernel's 16-bit limit
    pub fn from_grid(cols: usize, rows: usize) -> Self {
        let clamp = |n: usize| u16::try_from(n).unwrap_or(u16::MAX);
        Self::new(clamp(cols), clamp(rows))
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// Outcome of one non-blocking read from the master side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// This many bytes were placed at the start of the buffer
    Data(usize),
    /// Nothing available right now; the normal case on most polls
    NoData,
    /// The slave side is closed: the child and everything it started are gone
    Eof,
}

/// How the child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExitStatus {
    /// Exited normally with this code
    Exited(i32),
    /// Killed by this signal number
    Signaled(i32),
}

impl ExitStatus {
    /// Shell-style code: the exit code, or 128 + signal
    pub fn code(&self) -> i32 {
        match *self {
            ExitStatus::Exited(code) => code,
            ExitStatus::Signaled(signal) => 128 + signal,
        }
    }

    pub fn success(&self) -> bool {
        *self == ExitStatus::Exited(0)
    }
}

/// Program, arguments and environment for the child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Added to (or overriding) the inherited environment
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl PtyCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_size() {
        let size = WindowSize::new(80, 24);
        assert_eq!(size.cols, 80);
        assert_eq!(size.rows, 24);
        assert_eq!(WindowSize::default(), size);
    }

    #[test]
    fn test_window_size_from_grid_saturates() {
        let size = WindowSize::from_grid(100_000, 50);
        assert_eq!(size.cols, u16::MAX);
        assert_eq!(size.rows, 50);
    }

    #[test]
    fn test_exit_status_code() {
        assert_eq!(ExitStatus::Exited(3).code(), 3);
        assert_eq!(ExitStatus::Signaled(9).code(), 137);
        assert!(ExitStatus::Exited(0).success());
        assert!(!ExitStatus::Signaled(15).success());
    }

    #[test]
    fn test_command_builder() {
        let cmd = PtyCommand::new("/bin/sh")
            .arg("-c")
            .args(["echo", "hi"])
            .env("TERM", "xterm-256color")
            .cwd("/tmp");
        assert_eq!(cmd.program, "/bin/sh");
        assert_eq!(cmd.args, vec!["-c", "echo", "hi"]);
        assert_eq!(cmd.env, vec![("TERM".to_string(), "xterm-256color".to_string())]);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }
}
