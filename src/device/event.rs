use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::settings::WaitTimeout;

/// CPU-side wait handle armed by a fence.
///
/// Behaves like an auto-reset event: [`set`](Self::set) wakes a waiter, and a
/// successful [`wait`](Self::wait) consumes the signal.
#[derive(Debug, Default)]
pub struct CompletionEvent {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl CompletionEvent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals the event and wakes all blocked waiters.
    pub fn set(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        self.condvar.notify_all();
    }

    /// Clears a pending signal without waiting.
    pub fn reset(&self) {
        *self.signaled.lock() = false;
    }

    /// Returns `true` if a signal is pending.
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.signaled.lock()
    }

    /// Blocks until the event is signalled or the timeout expires.
    ///
    /// Returns `true` if the event was signalled. The signal is consumed.
    pub fn wait(&self, timeout: WaitTimeout) -> bool {
        self.wait_until(timeout.as_duration().map(|d| Instant::now() + d))
    }

    /// Blocks until the event is signalled or `deadline` passes. `None` waits
    /// forever.
    ///
    /// Returns `true` if the event was signalled. The signal is consumed.
    pub fn wait_until(&self, deadline: Option<Instant>) -> bool {
        let mut signaled = self.signaled.lock();
        match deadline {
            None => {
                while !*signaled {
                    self.condvar.wait(&mut signaled);
                }
            }
            Some(deadline) => {
                while !*signaled {
                    if self.condvar.wait_until(&mut signaled, deadline).timed_out() {
                        break;
                    }
                }
            }
        }

        let was_signaled = *signaled;
        *signaled = false;
        was_signaled
    }
}
