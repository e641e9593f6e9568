//! Staging Uploads
//!
//! Producers queue upload requests from any thread; the frame driver records
//! their copy commands and then keeps the staging memory alive until the
//! asynchronous copy has certainly finished.
//!
//! ```text
//!  push() ──▶ [pending FIFO] ──upload(cmd)──▶ [in-flight lifetime list] ──frame_sync()──▶ released
//! ```
//!
//! The pending queue is a `flume` channel, so `push` never contends with the
//! driver. The in-flight list is a [`DeferredReclaimer`].

mod buffer;

use lock_api::RawMutex;
use parking_lot::Mutex;

use crate::reclaim::DeferredReclaimer;
use crate::settings::UploadConcurrency;

pub use buffer::BufferUpload;

/// An upload request that records GPU copy commands into a command list `C`.
pub trait Upload<C: ?Sized> {
    fn upload(&mut self, commands: &mut C);
}

struct PendingUpload<U> {
    item: U,
    lifetime: i32,
}

/// Cloneable producer handle for a [`StagingUploader`].
pub struct UploadSender<U> {
    tx: flume::Sender<PendingUpload<U>>,
}

impl<U> UploadSender<U> {
    /// Queues `item`; `None` is ignored. Returns `true` if queued.
    pub fn push(&self, item: Option<U>, lifetime: i32) -> bool {
        let Some(item) = item else {
            return false;
        };
        // Fails only once the uploader is gone; the item is dropped then.
        self.tx.send(PendingUpload { item, lifetime }).is_ok()
    }
}

impl<U> Clone for UploadSender<U> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Producer/consumer staging pipeline.
///
/// `R` selects the lock of the in-flight list (see [`crate::reclaim`]).
pub struct StagingUploader<U, R: RawMutex = parking_lot::RawMutex> {
    tx: flume::Sender<PendingUpload<U>>,
    rx: flume::Receiver<PendingUpload<U>>,
    in_flight: DeferredReclaimer<U, R>,
    /// Held across draining in [`UploadConcurrency::Serialized`] mode.
    drain_lock: Option<Mutex<()>>,
}

impl<U, R: RawMutex> StagingUploader<U, R> {
    #[must_use]
    pub fn new(concurrency: UploadConcurrency) -> Self {
        let (tx, rx) = flume::unbounded();
        let drain_lock = match concurrency {
            UploadConcurrency::FrameDriver => None,
            UploadConcurrency::Serialized => Some(Mutex::new(())),
        };

        Self {
            tx,
            rx,
            in_flight: DeferredReclaimer::new(),
            drain_lock,
        }
    }

    #[must_use]
    pub fn concurrency(&self) -> UploadConcurrency {
        if self.drain_lock.is_some() {
            UploadConcurrency::Serialized
        } else {
            UploadConcurrency::FrameDriver
        }
    }

    /// Queues `item` for the next [`upload`](Self::upload). `None` is ignored.
    pub fn push(&self, item: Option<U>, lifetime: i32) -> bool {
        let Some(item) = item else {
            return false;
        };
        self.tx.send(PendingUpload { item, lifetime }).is_ok()
    }

    /// Returns a producer handle that can be moved to other threads.
    #[must_use]
    pub fn sender(&self) -> UploadSender<U> {
        UploadSender {
            tx: self.tx.clone(),
        }
    }

    /// Records every request pending at call entry into `commands`, in FIFO
    /// order, then moves each one to the in-flight list with its lifetime.
    ///
    /// Requests pushed while this call is draining wait for the next call.
    /// Returns the number of requests recorded.
    pub fn upload<C>(&self, commands: &mut C) -> usize
    where
        C: ?Sized,
        U: Upload<C>,
    {
        let _guard = self.drain_lock.as_ref().map(|lock| lock.lock());

        let snapshot = self.rx.len();
        let mut recorded = 0;
        for _ in 0..snapshot {
            let Ok(PendingUpload { mut item, lifetime }) = self.rx.try_recv() else {
                break;
            };
            item.upload(commands);
            self.in_flight.push(Some(item), lifetime);
            recorded += 1;
        }

        if recorded > 0 {
            log::trace!("Recorded {recorded} staging upload(s)");
        }
        recorded
    }

    /// Declares a frame boundary for in-flight requests. Returns the number
    /// released.
    pub fn frame_sync(&self) -> usize {
        self.in_flight.frame_sync()
    }

    /// Discards every pending request without recording it and releases the
    /// in-flight list.
    ///
    /// Same contract as [`DeferredReclaimer::clear`]: the GPU must be idle.
    /// Returns the number of requests released.
    pub fn clear(&self) -> usize {
        let _guard = self.drain_lock.as_ref().map(|lock| lock.lock());

        let discarded = self.rx.drain().count();
        if discarded > 0 {
            log::debug!("Discarded {discarded} staging upload(s) that were never recorded");
        }
        discarded + self.in_flight.clear()
    }

    /// Number of requests waiting for [`upload`](Self::upload).
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.rx.len()
    }

    /// Number of recorded requests still kept alive.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}

impl<U, R: RawMutex> Default for StagingUploader<U, R> {
    fn default() -> Self {
        Self::new(UploadConcurrency::default())
    }
}
