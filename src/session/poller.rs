//! Background polling and cursor blink timers
//!
//! [`SessionPoller`] is the single consumer of a session while attached: a
//! thread that reads one chunk per tick and reports what happened over a
//! channel. Other threads reach the session through
//! [`SessionPoller::with_session`], which holds the same lock as the poll, so
//! writes never overlap a read. [`SessionPoller::detach`] stops the thread and
//! hands the session back untouched, ready to be cached and reattached later.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{PollOutcome, Session, SessionError};
use crate::core::CursorBlink;
use crate::pty::ExitStatus;

/// What the poller thread observed
#[derive(Debug)]
pub enum SessionEvent {
    /// Bytes were read and applied; the screen changed
    Output(usize),
    /// The child is gone; the poller has stopped
    Exited(Option<ExitStatus>),
    /// A hard read failure; the session is dead and the poller has stopped
    Failed(SessionError),
}

/// Drives one session from a background thread
#[derive(Debug)]
pub struct SessionPoller {
    session: Arc<Mutex<Session>>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionPoller {
    /// Start polling `session` every `interval`
    pub fn start(session: Session, interval: Duration) -> (Self, Receiver<SessionEvent>) {
        let (tx, rx) = unbounded();
        let session = Arc::new(Mutex::new(session));
        let stop = Arc::new(AtomicBool::new(false));

        let thread = {
            let session = Arc::clone(&session);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("pier-session-poll".into())
                .spawn(move || poll_loop(&session, &stop, interval, &tx))
        };
        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "failed to start session poller thread");
                None
            },
        };

        (
            Self {
                session,
                stop,
                thread,
            },
            rx,
        )
    }

    /// Run `f` with exclusive access to the session
    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut lock(&self.session))
    }

    /// True while the polling thread is alive
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop polling and take the session back with its state intact
    pub fn detach(mut self) -> Result<Session, SessionError> {
        self.shutdown();
        let session = Arc::clone(&self.session);
        drop(self);
        Arc::try_unwrap(session)
            .map(|m| m.into_inner().unwrap_or_else(PoisonError::into_inner))
            .map_err(|_| SessionError::StillShared)
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            if thread.join().is_err() {
                tracing::error!("session poller thread panicked");
            }
        }
    }
}

impl Drop for SessionPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn poll_loop(
    session: &Mutex<Session>,
    stop: &AtomicBool,
    interval: Duration,
    tx: &Sender<SessionEvent>,
) {
    while !stop.load(Ordering::Acquire) {
        let outcome = lock(session).poll();
        match outcome {
            // More may be waiting; go again without sleeping
            Ok(PollOutcome::Output(n)) => {
                let _ = tx.send(SessionEvent::Output(n));
            },
            Ok(PollOutcome::Idle) => thread::park_timeout(interval),
            Ok(PollOutcome::Exited(status)) => {
                let _ = tx.send(SessionEvent::Exited(status));
                return;
            },
            Err(e) => {
                let _ = tx.send(SessionEvent::Failed(e));
                return;
            },
        }
    }
}

/// Toggles a shared cursor visibility flag at a fixed interval
#[derive(Debug)]
pub struct BlinkTimer {
    blink: Arc<Mutex<CursorBlink>>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl BlinkTimer {
    pub fn start(interval: Duration) -> Self {
        let blink = Arc::new(Mutex::new(CursorBlink::new(interval)));
        let stop = Arc::new(AtomicBool::new(false));

        let thread = {
            let blink = Arc::clone(&blink);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("pier-cursor-blink".into())
                .spawn(move || {
                    let period = interval.max(Duration::from_millis(1));
                    while !stop.load(Ordering::Acquire) {
                        thread::park_timeout(period);
                        blink
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .tick(Instant::now());
                    }
                })
        };
        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "failed to start cursor blink thread; cursor stays solid");
                None
            },
        };

        Self {
            blink,
            stop,
            thread,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.blink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_visible()
    }

    /// Show the cursor and restart the period
    pub fn reset(&self) {
        self.blink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset(Instant::now());
    }
}

impl Drop for BlinkTimer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}
