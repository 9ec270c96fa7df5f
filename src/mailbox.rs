//! Single-slot mailbox for continuous sample streams.
//!
//! Producers (possibly on other threads) overwrite the slot; the consumer
//! takes whatever is newest on its own schedule. Stale intermediate values
//! are silently replaced, so there is no queueing and no backpressure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

struct Slot<T> {
    value: Mutex<Option<T>>,
    posted: AtomicU64,
    overwritten: AtomicU64,
}

/// Cloneable handle to a shared single-value slot.
pub struct Mailbox<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Slot {
                value: Mutex::new(None),
                posted: AtomicU64::new(0),
                overwritten: AtomicU64::new(0),
            }),
        }
    }

    /// Store `value`, replacing any unread value.
    pub fn post(&self, value: T) {
        let mut slot = self.slot.value.lock().unwrap_or_else(|e| e.into_inner());
        if slot.replace(value).is_some() {
            self.slot.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        self.slot.posted.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the newest unread value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.slot
            .value
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Discard any unread value.
    pub fn clear(&self) {
        self.take();
    }

    /// Total values posted since creation.
    pub fn posted(&self) -> u64 {
        self.slot.posted.load(Ordering::Relaxed)
    }

    /// Values replaced before anyone read them.
    pub fn overwritten(&self) -> u64 {
        self.slot.overwritten.load(Ordering::Relaxed)
    }
}

impl<T> std::fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("posted", &self.posted())
            .field("overwritten", &self.overwritten())
            .finish()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
