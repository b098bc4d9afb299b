//! Unix PTY implementation
//!
//! Implements PTY creation and child process management using POSIX APIs.

use std::ffi::CString;
use std::os::fd::BorrowedFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::fcntl::{fcntl, open, FcntlArg, FdFlag, OFlag};
use nix::libc::{self, STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::poll::{poll, PollFd, PollFlags};
use nix::pty::{grantpt, posix_openpt, ptsname, unlockpt, PtyMaster};
use nix::sys::signal::{kill, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{chdir, close, dup2, execvp, fork, read, setsid, write, ForkResult, Pid};

use super::{ExitStatus, PtyCommand, PtyError, PtyResult, ReadStatus, WindowSize};

/// How long `destroy` waits after SIGTERM before escalating to SIGKILL
const TERMINATE_GRACE: Duration = Duration::from_millis(100);

/// Upper bound on how long `write_all` waits for the master to drain
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// A pseudoterminal with a spawned child process
pub struct Pty {
    /// The PTY master; `None` once destroyed
    master: Option<PtyMaster>,
    /// The child process ID
    child_pid: Pid,
    /// Set once the child has been reaped
    exit_status: Option<ExitStatus>,
}

/// Everything the child needs, converted before fork so the child never allocates
struct ChildSetup {
    program: CString,
    argv: Vec<CString>,
    env: Vec<(CString, CString)>,
    cwd: Option<CString>,
}

impl ChildSetup {
    fn prepare(command: &PtyCommand) -> PtyResult<Self> {
        let program = CString::new(command.program.as_str())?;
        let mut argv = Vec::with_capacity(command.args.len() + 1);
        argv.push(program.clone());
        for arg in &command.args {
            argv.push(CString::new(arg.as_str())?);
        }
        let env = command
            .env
            .iter()
            .map(|(k, v)| Ok((CString::new(k.as_str())?, CString::new(v.as_str())?)))
            .collect::<PtyResult<Vec<_>>>()?;
        let cwd = match &command.cwd {
            Some(dir) => Some(CString::new(dir.as_os_str().as_bytes())?),
            None => None,
        };
        Ok(Self {
            program,
            argv,
            env,
            cwd,
        })
    }
}

impl Pty {
    /// Spawn `command` on a fresh PTY with the given window size.
    ///
    /// The child becomes a session leader with the slave as its controlling
    /// terminal and standard streams. An exec failure is reported by the
    /// child exiting with status 127, not by this call.
    pub fn spawn(command: &PtyCommand, size: WindowSize) -> PtyResult<Self> {
        let setup = ChildSetup::prepare(command)?;

        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).map_err(PtyError::OpenMaster)?;
        grantpt(&master).map_err(PtyError::GrantPty)?;
        unlockpt(&master).map_err(PtyError::UnlockPty)?;

        // SAFETY: ptsname is not thread-safe, but we're calling it immediately
        // after unlockpt and before any other thread could interfere
        let slave_name = unsafe { ptsname(&master) }.map_err(PtyError::PtsName)?;

        set_window_size(master.as_raw_fd(), size)?;

        // Held open across the fork so the master never sees a hangup
        // before the child has the slave
        let slave_fd = open(
            slave_name.as_str(),
            OFlag::O_RDWR | OFlag::O_NOCTTY,
            Mode::empty(),
        )
        .map_err(PtyError::OpenSlave)?;

        // SAFETY: the child only calls async-signal-safe functions on
        // data prepared above, then execs or exits
        let forked = unsafe { fork() };
        match forked {
            Ok(ForkResult::Child) => {
                drop(master);
                exec_child(slave_fd, &setup)
            },
            Err(e) => {
                let _ = close(slave_fd);
                Err(PtyError::Fork(e))
            },
            Ok(ForkResult::Parent { child }) => {
                let _ = close(slave_fd);
                let pty = Pty {
                    master: Some(master),
                    child_pid: child,
                    exit_status: None,
                };
                // On failure `pty` is dropped here, which kills and reaps the child
                pty.configure_master()?;

                tracing::debug!(
                    pid = child.as_raw(),
                    program = %command.program,
                    cols = size.cols,
                    rows = size.rows,
                    "spawned child on pty"
                );

                Ok(pty)
            },
        }
    }

    /// Get the raw file descriptor of the PTY master
    pub fn master_fd(&self) -> PtyResult<RawFd> {
        self.master
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or(PtyError::Destroyed)
    }

    /// Get the child process ID
    pub fn child_pid(&self) -> Pid {
        self.child_pid
    }

    /// True until `destroy` has run
    pub fn is_open(&self) -> bool {
        self.master.is_some()
    }

    /// Check if the child process is still running
    pub fn is_alive(&mut self) -> bool {
        matches!(self.try_wait(), Ok(None))
    }

    /// Exit status if the child has already been reaped
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Reap the child if it has exited, without blocking
    pub fn try_wait(&mut self) -> PtyResult<Option<ExitStatus>> {
        if self.exit_status.is_some() {
            return Ok(self.exit_status);
        }
        let status = waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG)).map_err(PtyError::Wait)?;
        Ok(self.record(status))
    }

    /// Block until the child exits
    pub fn wait(&mut self) -> PtyResult<ExitStatus> {
        loop {
            if let Some(status) = self.exit_status {
                return Ok(status);
            }
            match waitpid(self.child_pid, None) {
                Ok(status) => {
                    self.record(status);
                },
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(PtyError::Wait(e)),
            }
        }
    }

    fn record(&mut self, status: WaitStatus) -> Option<ExitStatus> {
        let exit = match status {
            WaitStatus::Exited(_, code) => ExitStatus::Exited(code),
            WaitStatus::Signaled(_, signal, _) => ExitStatus::Signaled(signal as i32),
            _ => return None,
        };
        tracing::debug!(pid = self.child_pid.as_raw(), ?exit, "child reaped");
        self.exit_status = Some(exit);
        self.exit_status
    }

    /// Make the master non-blocking and close-on-exec
    fn configure_master(&self) -> PtyResult<()> {
        let fd = self.master_fd()?;
        let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(PtyError::SetNonBlocking)?;
        let flags = OFlag::from_bits_truncate(flags);
        fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK)).map_err(PtyError::SetNonBlocking)?;
        fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)).map_err(PtyError::SetNonBlocking)?;
        Ok(())
    }

    /// Read from the PTY master (non-blocking)
    ///
    /// Linux reports a closed slave as EIO, other platforms as a zero-length read.
    pub fn read(&self, buf: &mut [u8]) -> PtyResult<ReadStatus> {
        let fd = self.master_fd()?;
        loop {
            return match read(fd, buf) {
                Ok(0) => Ok(ReadStatus::Eof),
                Ok(n) => Ok(ReadStatus::Data(n)),
                // EAGAIN and EWOULDBLOCK are the same value on Linux
                Err(Errno::EAGAIN) => Ok(ReadStatus::NoData),
                Err(Errno::EINTR) => continue,
                Err(Errno::EIO) => Ok(ReadStatus::Eof),
                Err(e) => Err(PtyError::Read(e)),
            };
        }
    }

    /// Write to the PTY master
    ///
    /// Returns the number of bytes written, 0 if the master is full.
    pub fn write(&self, data: &[u8]) -> PtyResult<usize> {
        let fd = self.master_fd()?;
        loop {
            return match write(fd, data) {
                Ok(n) => Ok(n),
                Err(Errno::EAGAIN) => Ok(0),
                Err(Errno::EINTR) => continue,
                Err(e) => Err(PtyError::Write(e)),
            };
        }
    }

    /// Write all data to the PTY master, waiting for room when it is full
    pub fn write_all(&self, mut data: &[u8]) -> PtyResult<()> {
        let deadline = Instant::now() + WRITE_TIMEOUT;
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(PtyError::Write(Errno::EAGAIN));
                }
                self.poll_fd(PollFlags::POLLOUT, remaining.as_millis().min(100) as i32)?;
                continue;
            }
            data = &data[n..];
        }
        Ok(())
    }

    /// Wait until the master is readable or writable. A writer blocked on a
    /// full master uses this so it also wakes when the child produces output.
    pub fn poll_io(&self, timeout_ms: i32) -> PtyResult<bool> {
        self.poll_fd(PollFlags::POLLIN | PollFlags::POLLOUT, timeout_ms)
    }

    /// Poll for data available to read
    ///
    /// Returns true if a read would not block: data is waiting or the
    /// slave has hung up.
    pub fn poll_read(&self, timeout_ms: i32) -> PtyResult<bool> {
        self.poll_fd(PollFlags::POLLIN, timeout_ms)
    }

    fn poll_fd(&self, events: PollFlags, timeout_ms: i32) -> PtyResult<bool> {
        let fd = self.master_fd()?;
        // SAFETY: The master fd is valid while `self.master` is Some
        let borrowed_fd = unsafe { BorrowedFd::borrow_raw(fd) };
        let mut fds = [PollFd::new(&borrowed_fd, events)];
        let n = match poll(&mut fds, timeout_ms) {
            Ok(n) => n,
            Err(Errno::EINTR) => 0,
            Err(e) => return Err(PtyError::Poll(e)),
        };
        let ready = events | PollFlags::POLLHUP | PollFlags::POLLERR;
        Ok(n > 0 && fds[0].revents().is_some_and(|r| r.intersects(ready)))
    }

    /// Resize the PTY; the kernel delivers SIGWINCH to the foreground job
    pub fn resize(&self, size: WindowSize) -> PtyResult<()> {
        set_window_size(self.master_fd()?, size)
    }

    /// Current window size as the kernel sees it
    pub fn window_size(&self) -> PtyResult<WindowSize> {
        get_window_size(self.master_fd()?)
    }

    /// Send a signal to the child process
    pub fn signal(&self, signal: Signal) -> PtyResult<()> {
        kill(self.child_pid, signal).map_err(PtyError::Signal)
    }

    /// Terminate the child and close the master. Safe to call repeatedly.
    ///
    /// A live child gets SIGTERM, then SIGKILL if it is still around after
    /// a short grace period. The child is always reaped before returning.
    pub fn destroy(&mut self) {
        let Some(master) = self.master.take() else {
            return;
        };

        if matches!(self.try_wait(), Ok(None)) {
            let _ = self.signal(Signal::SIGTERM);
            let deadline = Instant::now() + TERMINATE_GRACE;
            while Instant::now() < deadline {
                if !matches!(self.try_wait(), Ok(None)) {
                    break;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            if matches!(self.try_wait(), Ok(None)) {
                tracing::debug!(pid = self.child_pid.as_raw(), "child ignored SIGTERM, killing");
                let _ = self.signal(Signal::SIGKILL);
                if let Err(e) = self.wait() {
                    tracing::warn!(pid = self.child_pid.as_raw(), error = %e, "failed to reap child");
                }
            }
        }

        drop(master);
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Runs in the forked child. Never returns.
fn exec_child(slave_fd: RawFd, setup: &ChildSetup) -> ! {
    if setsid().is_err() {
        child_exit(1);
    }

    // SAFETY: TIOCSCTTY is a valid ioctl for setting controlling terminal
    if unsafe { libc::ioctl(slave_fd, libc::TIOCSCTTY as _, 0) } < 0 {
        child_exit(1);
    }

    for target in [STDIN_FILENO, STDOUT_FILENO, STDERR_FILENO] {
        if dup2(slave_fd, target).is_err() {
            child_exit(1);
        }
    }
    if slave_fd > STDERR_FILENO {
        let _ = close(slave_fd);
    }

    if let Some(dir) = &setup.cwd {
        let _ = chdir(dir.as_c_str());
    }

    // SAFETY: single-threaded after fork; all strings were built before it
    unsafe {
        for (key, value) in &setup.env {
            libc::setenv(key.as_ptr(), value.as_ptr(), 1);
        }
        // The Rust runtime ignores SIGPIPE and exec would inherit that
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let _ = execvp(&setup.program, &setup.argv);
    child_exit(127)
}

fn child_exit(code: i32) -> ! {
    // SAFETY: _exit skips atexit handlers and destructors inherited from the parent
    unsafe { libc::_exit(code) }
}

/// Set the window size on a PTY file descriptor
fn set_window_size(fd: RawFd, size: WindowSize) -> PtyResult<()> {
    let winsize = libc::winsize {
        ws_row: size.rows,
        ws_col: size.cols,
        ws_xpixel: size.pixel_width,
        ws_ypixel: size.pixel_height,
    };

    // SAFETY: TIOCSWINSZ is a valid ioctl for setting window size
    let result = unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, &winsize) };

    if result < 0 {
        Err(PtyError::SetWinsize(Errno::last()))
    } else {
        Ok(())
    }
}

/// Get the window size from a PTY file descriptor
pub fn get_window_size(fd: RawFd) -> PtyResult<WindowSize> {
    let mut winsize = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: TIOCGWINSZ is a valid ioctl for getting window size
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut winsize) };

    if result < 0 {
        Err(PtyError::SetWinsize(Errno::last()))
    } else {
        Ok(WindowSize {
            rows: winsize.ws_row,
            cols: winsize.ws_col,
            pixel_width: winsize.ws_xpixel,
            pixel_height: winsize.ws_ypixel,
        })
    }
}
