//! PTY sessions
//!
//! A [`Session`] pairs a child process on a PTY with the [`Terminal`] that
//! interprets its output and the [`InputTranslator`] that encodes input for
//! it. All descriptor access goes through `&mut Session`, so reads and writes
//! on one PTY never overlap.

mod poller;
mod registry;

pub use poller::{BlinkTimer, SessionEvent, SessionPoller};
pub use registry::{CheckedOutSession, SessionId, SessionRegistry};

use crate::config::{ConfigError, TerminalConfig};
use crate::core::Snapshot;
use crate::input::{InputEvent, InputTranslator};
use crate::pty::{ExitStatus, Pty, PtyCommand, PtyError, ReadStatus, WindowSize};
use crate::terminal::Terminal;

use std::time::{Duration, Instant};

use nix::errno::Errno;

/// How long to wait for the child to become reapable once the PTY reports EOF
const REAP_GRACE: Duration = Duration::from_millis(50);

/// A write gives up once the child has neither read input nor produced
/// output for this long
const WRITE_STALL: Duration = Duration::from_secs(5);

/// Session-boundary failures. Parse anomalies never show up here.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to spawn session: {0}")]
    SpawnFailed(#[source] PtyError),

    #[error("write to session failed: {0}")]
    WriteFailed(#[source] PtyError),

    #[error("read from session failed: {0}")]
    ReadFailed(#[source] PtyError),

    #[error("kernel rejected resize: {0}")]
    ResizeRejected(#[source] PtyError),

    #[error("session has terminated")]
    Terminated,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no session with id {0}")]
    UnknownSession(SessionId),

    #[error("session {0} is already checked out")]
    AlreadyCheckedOut(SessionId),

    #[error("session is still shared with a running poller")]
    StillShared,
}

/// Lifecycle of a session. `Dead` is terminal: there is no respawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Dead,
}

/// Result of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing to read this tick
    Idle,
    /// This many bytes were read and applied to the screen
    Output(usize),
    /// The child is gone; carries its exit status when it could be reaped
    Exited(Option<ExitStatus>),
}

/// A child process on a PTY plus the terminal state fed by it
pub struct Session {
    pty: Pty,
    terminal: Terminal,
    input: InputTranslator,
    read_buf: Vec<u8>,
    state: SessionState,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pid", &self.pty.child_pid().as_raw())
            .field("state", &self.state)
            .field("cols", &self.terminal.screen().cols())
            .field("rows", &self.terminal.screen().rows())
            .finish()
    }
}

impl Session {
    /// Spawn the configured shell
    pub fn spawn(config: &TerminalConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Self::spawn_with(&config.shell_command(), config)
    }

    /// Spawn `program` with `args` at the given size, taking environment and
    /// buffer settings from `config`
    pub fn spawn_command(
        cols: usize,
        rows: usize,
        program: &str,
        args: &[String],
        config: &TerminalConfig,
    ) -> Result<Self, SessionError> {
        let config = TerminalConfig {
            cols,
            rows,
            ..config.clone()
        };
        config.validate()?;
        Self::spawn_with(&config.command_for(program, args), &config)
    }

    /// Spawn an explicit command
    pub fn spawn_with(command: &PtyCommand, config: &TerminalConfig) -> Result<Self, SessionError> {
        let size = WindowSize::from_grid(config.cols, config.rows);
        let pty = Pty::spawn(command, size).map_err(|e| {
            tracing::warn!(program = %command.program, error = %e, "session spawn failed");
            SessionError::SpawnFailed(e)
        })?;

        tracing::info!(
            pid = pty.child_pid().as_raw(),
            program = %command.program,
            cols = config.cols,
            rows = config.rows,
            "session started"
        );

        Ok(Self {
            pty,
            terminal: Terminal::new(config.cols, config.rows, config.scrollback_lines),
            input: InputTranslator::new(),
            read_buf: vec![0u8; config.read_chunk_size.max(1)],
            state: SessionState::Running,
        })
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal {
        &mut self.terminal
    }

    pub fn input(&self) -> &InputTranslator {
        &self.input
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Process ID of the child
    pub fn pid(&self) -> i32 {
        self.pty.child_pid().as_raw()
    }

    /// Exit status once the child has been reaped
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.pty.exit_status()
    }

    /// Read at most one chunk and apply it to the screen
    pub fn poll(&mut self) -> Result<PollOutcome, SessionError> {
        if self.state == SessionState::Dead {
            return Ok(PollOutcome::Exited(self.exit_status()));
        }

        match self.pty.read(&mut self.read_buf) {
            Ok(ReadStatus::Data(n)) => {
                self.terminal.process(&self.read_buf[..n]);
                Ok(PollOutcome::Output(n))
            },
            Ok(ReadStatus::NoData) => Ok(PollOutcome::Idle),
            Ok(ReadStatus::Eof) => {
                self.mark_dead();
                Ok(PollOutcome::Exited(self.exit_status()))
            },
            Err(e) => {
                tracing::warn!(pid = self.pid(), error = %e, "session read failed");
                self.mark_dead();
                Err(SessionError::ReadFailed(e))
            },
        }
    }

    /// Keep polling until nothing is left to read right now
    pub fn drain(&mut self) -> Result<PollOutcome, SessionError> {
        let mut total = 0;
        loop {
            match self.poll()? {
                PollOutcome::Output(n) => total += n,
                PollOutcome::Idle if total > 0 => return Ok(PollOutcome::Output(total)),
                outcome => return Ok(outcome),
            }
        }
    }

    /// Block up to `timeout` for output, then drain it
    pub fn wait_for_output(&mut self, timeout: Duration) -> Result<PollOutcome, SessionError> {
        if self.state == SessionState::Running {
            let ms = timeout.as_millis().min(i32::MAX as u128) as i32;
            // A poll error is followed by the same error on read
            let _ = self.pty.poll_read(ms);
        }
        self.drain()
    }

    /// Write raw bytes to the child.
    ///
    /// While the master is full, pending output is read and applied to the
    /// screen. A child that echoes its input (shells, `cat`, editors) blocks
    /// on output we have not read, so a large paste would otherwise stall.
    pub fn write(&mut self, mut data: &[u8]) -> Result<(), SessionError> {
        let mut last_progress = Instant::now();
        while !data.is_empty() {
            if self.state == SessionState::Dead {
                return Err(SessionError::Terminated);
            }
            let written = self.pty.write(data).map_err(|e| self.write_failed(e))?;
            if written > 0 {
                data = &data[written..];
                last_progress = Instant::now();
                continue;
            }

            if let PollOutcome::Output(_) = self.drain()? {
                last_progress = Instant::now();
                continue;
            }
            if last_progress.elapsed() >= WRITE_STALL {
                return Err(self.write_failed(PtyError::Write(Errno::EAGAIN)));
            }
            // A poll error is followed by the same error on write
            let _ = self.pty.poll_io(10);
        }
        Ok(())
    }

    fn write_failed(&self, e: PtyError) -> SessionError {
        tracing::warn!(pid = self.pid(), error = %e, "session write failed");
        SessionError::WriteFailed(e)
    }

    /// Translate a host input event and write the result.
    ///
    /// Pointer events only move the selection.
    pub fn handle_input(&mut self, event: &InputEvent) -> Result<(), SessionError> {
        if let InputEvent::Pointer(pointer) = event {
            self.terminal.handle_pointer(pointer);
            return Ok(());
        }
        let bytes = self.input.handle_input_event(event, &self.terminal.modes());
        if bytes.is_empty() {
            return Ok(());
        }
        self.write(&bytes)
    }

    /// Resize the grid and the kernel's idea of the terminal size.
    ///
    /// The grid always follows the request; a kernel failure is reported
    /// afterwards as `ResizeRejected`.
    pub fn resize(&mut self, cols: usize, rows: usize) -> Result<(), SessionError> {
        let cols = cols.max(1);
        let rows = rows.max(1);
        self.terminal.resize(cols, rows);

        if self.state == SessionState::Dead {
            return Ok(());
        }
        self.pty
            .resize(WindowSize::from_grid(cols, rows))
            .map_err(|e| {
                tracing::warn!(pid = self.pid(), cols, rows, error = %e, "pty resize rejected");
                SessionError::ResizeRejected(e)
            })
    }

    /// Pull-model view for a renderer
    pub fn snapshot(&self, blink_visible: bool) -> Snapshot {
        self.terminal.snapshot(blink_visible)
    }

    /// Terminate the child and close the PTY. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.pty.is_open() {
            tracing::info!(pid = self.pid(), "destroying session");
        }
        self.pty.destroy();
        self.state = SessionState::Dead;
    }

    fn mark_dead(&mut self) {
        if self.state == SessionState::Dead {
            return;
        }
        self.state = SessionState::Dead;

        let deadline = Instant::now() + REAP_GRACE;
        while matches!(self.pty.try_wait(), Ok(None)) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        tracing::info!(pid = self.pid(), status = ?self.exit_status(), "session exited");
    }
}
