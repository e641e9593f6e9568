//! Deferred Reclamation
//!
//! GPU objects cannot be released the moment the CPU stops using them: frames
//! still in flight may read them. A [`DeferredReclaimer`] holds retired handles
//! for a number of frame boundaries and releases them once that count runs out.
//!
//! # Lock strategies
//!
//! The container is generic over a [`lock_api::RawMutex`]:
//!
//! | Alias                  | Lock                       | Call site                          |
//! |------------------------|----------------------------|------------------------------------|
//! | [`DisposableReclaimer`]| `spin` spin lock           | hot path, very short critical sections |
//! | [`ResourceReclaimer`]  | `parking_lot` blocking mutex | GPU memory resources             |
//!
//! # Lifetimes
//!
//! A handle pushed with lifetime `N` is released by the `N`-th subsequent
//! [`frame_sync`](DeferredReclaimer::frame_sync). Lifetimes of zero or below
//! are released by the first sweep.
//!
//! Releasing means dropping the owned handle. For reference-counted handles
//! (`Arc`, `wgpu` objects) this only decrements the count.

use lock_api::{Mutex, RawMutex};

/// Spin lock used by the hot-path reclaimer.
pub type SpinLock = spin::mutex::SpinMutex<()>;

/// Low-overhead reclaimer for generic disposable objects.
pub type DisposableReclaimer<T> = DeferredReclaimer<T, SpinLock>;

/// Reclaimer for GPU memory resources.
pub type ResourceReclaimer<T> = DeferredReclaimer<T, parking_lot::RawMutex>;

struct ReclaimEntry<T> {
    handle: T,
    /// Remaining frame boundaries; always positive while listed.
    remaining: i32,
}

/// Frame-lifetime-counted collection of owned handles.
pub struct DeferredReclaimer<T, R: RawMutex = parking_lot::RawMutex> {
    entries: Mutex<R, Vec<ReclaimEntry<T>>>,
}

impl<T, R: RawMutex> DeferredReclaimer<T, R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Takes ownership of `handle` and keeps it alive for `lifetime` frame
    /// boundaries. `None` is ignored.
    ///
    /// Returns `true` if a handle was queued.
    pub fn push(&self, handle: Option<T>, lifetime: i32) -> bool {
        let Some(handle) = handle else {
            return false;
        };

        self.entries.lock().push(ReclaimEntry {
            handle,
            remaining: lifetime,
        });
        true
    }

    /// Moves the handle out of `slot`, leaving `None` behind.
    pub fn push_slot(&self, slot: &mut Option<T>, lifetime: i32) -> bool {
        self.push(slot.take(), lifetime)
    }

    /// Declares a frame boundary: every entry loses one frame of lifetime and
    /// entries that run out are released.
    ///
    /// Expired handles are dropped after the lock is released. Returns the
    /// number of handles released.
    pub fn frame_sync(&self) -> usize {
        let expired: Vec<T> = {
            let mut entries = self.entries.lock();
            entries
                .extract_if(.., |entry| {
                    entry.remaining = entry.remaining.saturating_sub(1);
                    entry.remaining <= 0
                })
                .map(|entry| entry.handle)
                .collect()
        };

        let released = expired.len();
        if released > 0 {
            log::trace!("Reclaimer released {released} handle(s)");
        }
        drop(expired);
        released
    }

    /// Releases every entry regardless of its remaining lifetime.
    ///
    /// Only call this once the GPU is idle with respect to every listed
    /// handle, e.g. after a full fence wait at shutdown. Returns the number of
    /// handles released.
    pub fn clear(&self) -> usize {
        let drained = std::mem::take(&mut *self.entries.lock());
        let released = drained.len();
        drop(drained);
        released
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T, R: RawMutex> Default for DeferredReclaimer<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R: RawMutex> Drop for DeferredReclaimer<T, R> {
    fn drop(&mut self) {
        let remaining = self.entries.get_mut().len();
        if remaining > 0 {
            log::warn!(
                "DeferredReclaimer dropped with {remaining} pending handle(s); releasing without a GPU idle guarantee"
            );
        }
    }
}
