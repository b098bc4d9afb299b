//! Session cache keyed by generation-checked ids
//!
//! Sessions that are not attached to a consumer live here. A consumer checks
//! a session out, polls it, and checks it back in when it detaches; only one
//! checkout per id can exist at a time. Destroying an id is idempotent and
//! terminates the session exactly once, even while it is checked out. A
//! checkout that is dropped instead of checked in frees its slot.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{Session, SessionError};

/// Opaque handle for a registered session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId {
    index: u32,
    generation: u32,
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
enum SlotState {
    Vacant,
    Cached(Box<Session>),
    CheckedOut(Lease),
    /// Destroyed while checked out; torn down on checkin
    Tombstoned(Lease),
}

/// Registry side of a checkout. Set once the guard is dropped without
/// being checked in.
type Lease = Arc<AtomicBool>;

fn is_abandoned(lease: &Lease) -> bool {
    lease.load(Ordering::Acquire)
}

/// Guard side of a checkout. Marks the lease abandoned on drop unless
/// disarmed by checkin.
#[derive(Debug)]
struct LeaseGuard {
    lease: Lease,
    armed: bool,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if self.armed {
            self.lease.store(true, Ordering::Release);
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    state: SlotState,
}

/// A session taken out of the registry. Deref to reach the session.
///
/// Hand it back with [`SessionRegistry::checkin`]. Dropping it instead
/// destroys the session, and the registry frees the id the next time it is
/// used.
#[must_use = "a checked-out session must be checked back in"]
#[derive(Debug)]
pub struct CheckedOutSession {
    id: SessionId,
    session: Box<Session>,
    guard: LeaseGuard,
}

impl CheckedOutSession {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Deref for CheckedOutSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl DerefMut for CheckedOutSession {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

/// Owns detached sessions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return its id
    pub fn insert(&mut self, session: Session) -> SessionId {
        self.reclaim();
        let state = SlotState::Cached(Box::new(session));
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.state = state;
            return SessionId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            state,
        });
        SessionId {
            index,
            generation: 0,
        }
    }

    /// Take a session out for exclusive use
    pub fn checkout(&mut self, id: SessionId) -> Result<CheckedOutSession, SessionError> {
        self.reclaim();
        let slot = self.slot_mut(id).ok_or(SessionError::UnknownSession(id))?;
        let lease = Lease::default();
        match std::mem::replace(&mut slot.state, SlotState::CheckedOut(Arc::clone(&lease))) {
            SlotState::Cached(session) => Ok(CheckedOutSession {
                id,
                session,
                guard: LeaseGuard { lease, armed: true },
            }),
            SlotState::Vacant => {
                slot.state = SlotState::Vacant;
                Err(SessionError::UnknownSession(id))
            },
            other => {
                slot.state = other;
                Err(SessionError::AlreadyCheckedOut(id))
            },
        }
    }

    /// Return a checked-out session.
    ///
    /// If the id was destroyed in the meantime the session is terminated
    /// here and the slot is freed.
    pub fn checkin(&mut self, checked_out: CheckedOutSession) -> Result<(), SessionError> {
        let CheckedOutSession {
            id,
            mut session,
            mut guard,
        } = checked_out;
        guard.armed = false;
        self.reclaim();
        let Some(slot) = self.slot_mut(id) else {
            session.destroy();
            return Err(SessionError::UnknownSession(id));
        };
        match &slot.state {
            SlotState::CheckedOut(lease) if Arc::ptr_eq(lease, &guard.lease) => {
                slot.state = SlotState::Cached(session);
                Ok(())
            },
            SlotState::Tombstoned(lease) if Arc::ptr_eq(lease, &guard.lease) => {
                session.destroy();
                self.release(id);
                Ok(())
            },
            _ => {
                session.destroy();
                Err(SessionError::UnknownSession(id))
            },
        }
    }

    /// Destroy a session. Returns false if the id was already gone.
    pub fn destroy(&mut self, id: SessionId) -> bool {
        self.reclaim();
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        match std::mem::replace(&mut slot.state, SlotState::Vacant) {
            SlotState::Cached(mut session) => {
                session.destroy();
                self.release(id);
                true
            },
            SlotState::CheckedOut(lease) => {
                slot.state = SlotState::Tombstoned(lease);
                tracing::debug!(%id, "session destroyed while checked out");
                true
            },
            tombstoned @ SlotState::Tombstoned(_) => {
                slot.state = tombstoned;
                false
            },
            SlotState::Vacant => false,
        }
    }

    /// Remove a cached session without terminating it
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.reclaim();
        let slot = self.slot_mut(id)?;
        match std::mem::replace(&mut slot.state, SlotState::Vacant) {
            SlotState::Cached(session) => {
                self.release(id);
                Some(*session)
            },
            other => {
                slot.state = other;
                None
            },
        }
    }

    /// True while the id refers to a live session, cached or checked out
    pub fn contains(&self, id: SessionId) -> bool {
        self.slot(id).is_some_and(|slot| match &slot.state {
            SlotState::Cached(_) => true,
            SlotState::CheckedOut(lease) => !is_abandoned(lease),
            _ => false,
        })
    }

    pub fn is_checked_out(&self, id: SessionId) -> bool {
        self.slot(id).is_some_and(|slot| {
            matches!(&slot.state, SlotState::CheckedOut(lease) if !is_abandoned(lease))
        })
    }

    /// Number of sessions held, including checked-out ones not yet returned
    pub fn len(&self) -> usize {
        let abandoned = self
            .slots
            .iter()
            .filter(|slot| match &slot.state {
                SlotState::CheckedOut(lease) | SlotState::Tombstoned(lease) => {
                    is_abandoned(lease)
                },
                _ => false,
            })
            .count();
        self.live - abandoned
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of the cached sessions
    pub fn cached_ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            matches!(slot.state, SlotState::Cached(_)).then_some(SessionId {
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    fn slot(&self, id: SessionId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
    }

    fn slot_mut(&mut self, id: SessionId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
    }

    /// Free the slots of checkouts that were dropped instead of checked in.
    /// Their sessions were already destroyed by the drop.
    fn reclaim(&mut self) {
        let abandoned: Vec<SessionId> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| match &slot.state {
                SlotState::CheckedOut(lease) | SlotState::Tombstoned(lease) => {
                    is_abandoned(lease)
                },
                _ => false,
            })
            .map(|(index, slot)| SessionId {
                index: index as u32,
                generation: slot.generation,
            })
            .collect();
        for id in abandoned {
            tracing::debug!(%id, "reclaiming dropped checkout");
            self.release(id);
        }
    }

    /// Free a slot and bump its generation so old ids go stale
    fn release(&mut self, id: SessionId) {
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            slot.state = SlotState::Vacant;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            self.live -= 1;
        }
    }
}
