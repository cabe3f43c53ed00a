//! Client-side session table
//!
//! Mirrors the device's fixed set of session slots and tracks per-handle
//! state:
//! - Device-issued handle
//! - Session kind (HTTP or raw TCP)
//! - Read and write cursors
//! - Whether the device still expects a request body

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::constants::{INVALID_HANDLE, MAX_SESSIONS};
use crate::error::{Error, Result};

/// What the session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// HTTP(S) request/response
    Http,
    /// Raw TCP byte stream
    Tcp,
}

impl SessionKind {
    /// Classify by URL scheme
    pub fn from_url(url: &str) -> Self {
        let scheme = url.split_once("://").map(|(s, _)| s).unwrap_or("");
        if scheme.eq_ignore_ascii_case("tcp") {
            Self::Tcp
        } else {
            Self::Http
        }
    }
}

/// State of one open session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub handle: u16,
    pub kind: SessionKind,
    /// Device asked for a request body before the response is available
    pub needs_body_write: bool,
    /// Next offset a Write must use
    pub write_cursor: u32,
    /// Offset just past the last byte read
    pub read_cursor: u32,
}

impl Session {
    pub fn new(handle: u16, kind: SessionKind) -> Self {
        Self {
            handle,
            kind,
            needs_body_write: false,
            write_cursor: 0,
            read_cursor: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Free,
    /// Held for an Open that is in flight
    Reserved,
    Active(Session),
}

/// Fixed-capacity table of open sessions
///
/// Thread-safe and can be cloned cheaply (Arc internally).
#[derive(Debug, Clone)]
pub struct SessionTable {
    slots: Arc<Mutex<Vec<Slot>>>,
}

impl SessionTable {
    /// Table sized to the device limit
    pub fn new() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(vec![Slot::Free; capacity])),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.lock().len()
    }

    /// Number of active sessions (reservations not counted)
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|slot| matches!(slot, Slot::Active(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hold a free slot for an Open about to be sent
    ///
    /// Dropping the returned [`Reservation`] without binding it frees the
    /// slot again.
    pub fn reserve(&self) -> Result<Reservation> {
        let mut slots = self.slots.lock();

        let index = slots
            .iter()
            .position(|slot| matches!(slot, Slot::Free))
            .ok_or(Error::NoHandles)?;
        slots[index] = Slot::Reserved;

        Ok(Reservation {
            table: self.clone(),
            index,
            bound: false,
        })
    }

    /// Snapshot of the session for `handle`
    pub fn get(&self, handle: u16) -> Option<Session> {
        self.slots.lock().iter().find_map(|slot| match slot {
            Slot::Active(session) if session.handle == handle => Some(*session),
            _ => None,
        })
    }

    pub fn contains(&self, handle: u16) -> bool {
        self.get(handle).is_some()
    }

    /// Mutate the session for `handle` in place
    pub fn update<T>(&self, handle: u16, f: impl FnOnce(&mut Session) -> T) -> Result<T> {
        let mut slots = self.slots.lock();

        slots
            .iter_mut()
            .find_map(|slot| match slot {
                Slot::Active(session) if session.handle == handle => Some(session),
                _ => None,
            })
            .map(f)
            .ok_or(Error::HandleNotFound(handle))
    }

    /// Forget `handle`, returning its last state
    pub fn remove(&self, handle: u16) -> Option<Session> {
        let mut slots = self.slots.lock();

        for slot in slots.iter_mut() {
            if let Slot::Active(session) = *slot {
                if session.handle == handle {
                    *slot = Slot::Free;
                    debug!(handle, "Session released");
                    return Some(session);
                }
            }
        }
        None
    }

    /// Handles of all active sessions, in slot order
    pub fn handles(&self) -> Vec<u16> {
        self.slots
            .lock()
            .iter()
            .filter_map(|slot| match slot {
                Slot::Active(session) => Some(session.handle),
                _ => None,
            })
            .collect()
    }

    /// Drop every active session; outstanding reservations are kept
    pub fn clear(&self) {
        for slot in self.slots.lock().iter_mut() {
            if matches!(slot, Slot::Active(_)) {
                *slot = Slot::Free;
            }
        }
    }

    fn bind_slot(&self, index: usize, session: Session) -> Result<()> {
        if session.handle == INVALID_HANDLE {
            return Err(Error::InvalidFrame("device issued invalid handle 0".into()));
        }

        let mut slots = self.slots.lock();

        // The device reused a handle we still track: it evicted that session
        for (i, slot) in slots.iter_mut().enumerate() {
            if let Slot::Active(stale) = *slot {
                if i != index && stale.handle == session.handle {
                    warn!(handle = stale.handle, "Device reissued handle, dropping stale session");
                    *slot = Slot::Free;
                }
            }
        }

        slots[index] = Slot::Active(session);
        debug!(handle = session.handle, kind = ?session.kind, "Session bound");
        Ok(())
    }

    fn free_slot(&self, index: usize) {
        let mut slots = self.slots.lock();
        if matches!(slots[index], Slot::Reserved) {
            slots[index] = Slot::Free;
        }
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A slot held for an in-flight Open
#[derive(Debug)]
#[must_use = "dropping a reservation frees the slot"]
pub struct Reservation {
    table: SessionTable,
    index: usize,
    bound: bool,
}

impl Reservation {
    /// Turn the reservation into an active session
    pub fn bind(mut self, session: Session) -> Result<()> {
        self.table.bind_slot(self.index, session)?;
        self.bound = true;
        Ok(())
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.bound {
            self.table.free_slot(self.index);
        }
    }
}
