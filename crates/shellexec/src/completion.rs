//! Single-fire completion signal
//!
//! A value is published at most once. Blocking and async waiters all wake
//! once it is set and all observe the same value.

use std::pin::pin;
use std::sync::{Condvar, Mutex, OnceLock, PoisonError};
use tokio::sync::Notify;

pub struct Completion<T> {
    value: OnceLock<T>,
    lock: Mutex<()>,
    cond: Condvar,
    notify: Notify,
}

impl<T> Completion<T> {
    pub fn new() -> Self {
        Self {
            value: OnceLock::new(),
            lock: Mutex::new(()),
            cond: Condvar::new(),
            notify: Notify::new(),
        }
    }

    /// Publish `value` if nothing has been published yet.
    ///
    /// Returns `true` when this call won. The value is fully stored before
    /// any waiter can observe the signal as fired.
    pub fn fire(&self, value: T) -> bool {
        if self.value.set(value).is_err() {
            return false;
        }

        // Waiters check the value while holding the lock, so taking it here
        // means none of them can be between that check and `Condvar::wait`.
        drop(self.lock.lock().unwrap_or_else(PoisonError::into_inner));
        self.cond.notify_all();
        self.notify.notify_waiters();
        true
    }

    /// Whether a value has been published
    pub fn is_fired(&self) -> bool {
        self.value.get().is_some()
    }

    /// The published value, without blocking
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Block the calling thread until a value is published
    pub fn wait(&self) -> &T {
        if let Some(value) = self.value.get() {
            return value;
        }

        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(value) = self.value.get() {
                return value;
            }
            guard = self
                .cond
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Wait asynchronously until a value is published
    pub async fn wait_async(&self) -> &T {
        loop {
            let mut notified = pin!(self.notify.notified());
            // Register before checking so a concurrent `fire` cannot slip between.
            notified.as_mut().enable();

            if let Some(value) = self.value.get() {
                return value;
            }
            notified.await;
        }
    }
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("value", &self.value.get())
            .finish()
    }
}
