//! A single-slot, two-party handoff point, generalized from shared booleans
//! and condition variables into a small reusable type. Used both for
//! stdin-to-request-loop handoff and request-loop-to-output handoff.

use std::sync::{Condvar, Mutex};

pub struct Rendezvous<T> {
    slot: Mutex<Option<T>>,
    filled: Condvar,
    emptied: Condvar,
}

impl<T> Rendezvous<T> {
    pub fn new() -> Self {
        Rendezvous { slot: Mutex::new(None), filled: Condvar::new(), emptied: Condvar::new() }
    }

    /// Blocks until the slot is empty, then fills it and wakes a waiting
    /// `take`. Returns `false` if `stop` signalled while waiting for the
    /// slot to empty, in which case nothing was placed.
    pub fn put(&self, value: T, stop: &(impl Fn() -> bool + ?Sized)) -> bool {
        let mut slot = self.slot.lock().unwrap();
        while slot.is_some() {
            if stop() {
                return false;
            }
            let (guard, _timeout) =
                self.emptied.wait_timeout(slot, std::time::Duration::from_millis(50)).unwrap();
            slot = guard;
        }
        *slot = Some(value);
        self.filled.notify_one();
        true
    }

    /// Blocks until the slot is full, then empties it and wakes a waiting
    /// `put`. Returns `None` if `stop` signalled while waiting and the slot
    /// never filled.
    pub fn take(&self, stop: &(impl Fn() -> bool + ?Sized)) -> Option<T> {
        let mut slot = self.slot.lock().unwrap();
        while slot.is_none() {
            if stop() {
                return None;
            }
            let (guard, _timeout) =
                self.filled.wait_timeout(slot, std::time::Duration::from_millis(50)).unwrap();
            slot = guard;
        }
        let value = slot.take();
        self.emptied.notify_one();
        value
    }
}

impl<T> Default for Rendezvous<T> {
    fn default() -> Self {
        Self::new()
    }
}
