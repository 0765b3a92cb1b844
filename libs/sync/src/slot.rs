use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};

/// Single-slot mailbox from one producer context to one consumer.
///
/// A newer value displaces an unconsumed older one: for edge events like
/// estop presses the latest state is the one that matters. The displaced
/// value is handed back so the producer can tell a post was dropped.
pub struct Slot<M: RawMutex, T> {
    inner: Mutex<M, RefCell<Option<T>>>,
}

impl<M: RawMutex, T> Slot<M, T> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Leaves `value` for the consumer, returning any unconsumed
    /// predecessor.
    pub fn post(&self, value: T) -> Option<T> {
        self.inner.lock(|cell| cell.borrow_mut().replace(value))
    }

    /// Takes the pending value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.inner.lock(|cell| cell.borrow_mut().take())
    }

    pub fn is_occupied(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().is_some())
    }
}

impl<M: RawMutex, T> Default for Slot<M, T> {
    fn default() -> Self {
        Self::new()
    }
}
