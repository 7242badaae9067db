//! Single-slot session-changed notification.

use crate::error::{IdentityError, Result};
use crate::session::SessionInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Handler = Arc<dyn Fn(Option<&SessionInfo>) + Send + Sync>;

/// Holds the one standing session-changed listener.
#[derive(Default)]
pub(crate) struct ListenerSlot {
    next_id: AtomicU64,
    current: Mutex<Option<(u64, Handler)>>,
}

impl std::fmt::Debug for ListenerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSlot")
            .field("occupied", &self.lock().is_some())
            .finish()
    }
}

impl ListenerSlot {
    fn lock(&self) -> MutexGuard<'_, Option<(u64, Handler)>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn register(self: &Arc<Self>, handler: Handler) -> Result<Subscription> {
        let mut current = self.lock();
        if current.is_some() {
            return Err(IdentityError::ListenerActive);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *current = Some((id, handler));
        Ok(Subscription {
            slot: Arc::downgrade(self),
            id,
        })
    }

    /// Invokes the listener, if any, outside the slot lock.
    pub(crate) fn notify(&self, session: Option<&SessionInfo>) {
        let handler = self.lock().as_ref().map(|(_, h)| Arc::clone(h));
        if let Some(handler) = handler {
            handler(session);
        }
    }

    fn release(&self, id: u64) {
        let mut current = self.lock();
        if current.as_ref().is_some_and(|(active, _)| *active == id) {
            *current = None;
        }
    }
}

/// Handle for a registered session-changed listener.
///
/// The listener stays registered until this handle is dropped or
/// [`unsubscribe`](Self::unsubscribe) is called.
#[derive(Debug)]
#[must_use = "dropping the subscription unregisters the listener"]
pub struct Subscription {
    slot: Weak<ListenerSlot>,
    id: u64,
}

impl Subscription {
    /// Unregisters the listener.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.upgrade() {
            slot.release(self.id);
        }
    }
}
