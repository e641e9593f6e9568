//! CPU Timeline Backend
//!
//! A software implementation of the device seam. A [`TimelineQueue`] records
//! fence signals the way a real queue would place them behind submitted work,
//! and "executes" them either immediately or when the owner calls
//! [`TimelineQueue::retire_next`] / [`TimelineQueue::retire_all`].
//!
//! The backend also exposes counters (signals issued, events armed) so callers
//! can observe whether a fence wait actually blocked.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{CompletionEvent, GpuDevice, GpuFence, GpuQueue};
use crate::errors::DeviceError;

// ─── Fence ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct FenceShared {
    completed: AtomicU64,
    waiters: Mutex<Vec<(u64, Arc<CompletionEvent>)>>,
    armed: AtomicUsize,
    events_unsupported: AtomicBool,
}

/// Shared handle to a software fence.
#[derive(Debug, Clone, Default)]
pub struct TimelineFence(Arc<FenceShared>);

impl TimelineFence {
    #[must_use]
    pub fn new(initial_value: u64) -> Self {
        let fence = Self::default();
        fence.0.completed.store(initial_value, Ordering::Release);
        fence
    }

    /// Moves the completed value forward to `value` and fires every event
    /// armed at or below it. Lower values are ignored.
    pub fn advance(&self, value: u64) {
        let completed = self.0.completed.fetch_max(value, Ordering::AcqRel).max(value);

        let mut waiters = self.0.waiters.lock();
        waiters.retain(|(target, event)| {
            if *target <= completed {
                event.set();
                false
            } else {
                true
            }
        });
    }

    /// Number of times an event was armed on this fence.
    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.0.armed.load(Ordering::Acquire)
    }

    /// Number of armed events still waiting for completion.
    #[must_use]
    pub fn pending_waiters(&self) -> usize {
        self.0.waiters.lock().len()
    }
}

impl GpuFence for TimelineFence {
    fn completed_value(&self) -> u64 {
        self.0.completed.load(Ordering::Acquire)
    }

    fn set_event_on_completion(
        &self,
        value: u64,
        event: &Arc<CompletionEvent>,
    ) -> Result<(), DeviceError> {
        if self.0.events_unsupported.load(Ordering::Acquire) {
            return Err(DeviceError::Unsupported(
                "completion events on this fence".to_string(),
            ));
        }
        self.0.armed.fetch_add(1, Ordering::AcqRel);

        let mut waiters = self.0.waiters.lock();
        if self.completed_value() >= value {
            event.set();
        } else {
            waiters.push((value, Arc::clone(event)));
        }
        Ok(())
    }
}

// ─── Queue ───────────────────────────────────────────────────────────────────

/// When recorded signals reach their fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireMode {
    /// The queue is always idle: signals complete as they are issued.
    Immediate,
    /// Signals complete only when retired explicitly.
    Deferred,
}

/// Software execution queue.
#[derive(Debug)]
pub struct TimelineQueue {
    mode: RetireMode,
    pending: Mutex<VecDeque<(TimelineFence, u64)>>,
    signals: AtomicUsize,
    signal_error: Mutex<Option<DeviceError>>,
}

impl TimelineQueue {
    #[must_use]
    pub fn new(mode: RetireMode) -> Self {
        Self {
            mode,
            pending: Mutex::new(VecDeque::new()),
            signals: AtomicUsize::new(0),
            signal_error: Mutex::new(None),
        }
    }

    /// A queue whose work is complete as soon as it is submitted.
    #[must_use]
    pub fn immediate() -> Self {
        Self::new(RetireMode::Immediate)
    }

    /// A queue whose work completes only on [`retire_next`](Self::retire_next)
    /// or [`retire_all`](Self::retire_all).
    #[must_use]
    pub fn deferred() -> Self {
        Self::new(RetireMode::Deferred)
    }

    /// Makes subsequent signals fail with `error`. `None` restores normal
    /// operation.
    pub fn set_signal_error(&self, error: Option<DeviceError>) {
        *self.signal_error.lock() = error;
    }

    /// Completes the oldest recorded signal. Returns its value.
    pub fn retire_next(&self) -> Option<u64> {
        let (fence, value) = self.pending.lock().pop_front()?;
        fence.advance(value);
        Some(value)
    }

    /// Completes every recorded signal in submission order.
    pub fn retire_all(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().drain(..).collect();
        let count = drained.len();
        for (fence, value) in drained {
            fence.advance(value);
        }
        count
    }

    /// Number of signals recorded but not yet retired.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Total number of successful signals issued on this queue.
    #[must_use]
    pub fn signal_count(&self) -> usize {
        self.signals.load(Ordering::Acquire)
    }
}

impl Default for TimelineQueue {
    fn default() -> Self {
        Self::immediate()
    }
}

impl GpuQueue<TimelineFence> for TimelineQueue {
    fn signal(&self, fence: &TimelineFence, value: u64) -> Result<(), DeviceError> {
        if let Some(error) = self.signal_error.lock().clone() {
            return Err(error);
        }
        self.signals.fetch_add(1, Ordering::AcqRel);

        match self.mode {
            RetireMode::Immediate => fence.advance(value),
            RetireMode::Deferred => self.pending.lock().push_back((fence.clone(), value)),
        }
        Ok(())
    }
}

// ─── Device ──────────────────────────────────────────────────────────────────

/// Software device producing [`TimelineFence`]s.
#[derive(Debug, Clone, Default)]
pub struct TimelineDevice {
    fence_error: Option<DeviceError>,
    event_error: Option<DeviceError>,
    events_unsupported: bool,
}

impl TimelineDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes fence creation fail with `error`.
    #[must_use]
    pub fn with_fence_error(mut self, error: DeviceError) -> Self {
        self.fence_error = Some(error);
        self
    }

    /// Makes event creation fail with `error`.
    #[must_use]
    pub fn with_event_error(mut self, error: DeviceError) -> Self {
        self.event_error = Some(error);
        self
    }

    /// Creates fences that reject [`GpuFence::set_event_on_completion`] with
    /// [`DeviceError::Unsupported`]. Completion can still be polled.
    #[must_use]
    pub fn without_completion_events(mut self) -> Self {
        self.events_unsupported = true;
        self
    }
}

impl GpuDevice for TimelineDevice {
    type Fence = TimelineFence;

    fn create_fence(&self, initial_value: u64) -> Result<TimelineFence, DeviceError> {
        match &self.fence_error {
            Some(error) => Err(error.clone()),
            None => {
                let fence = TimelineFence::new(initial_value);
                fence
                    .0
                    .events_unsupported
                    .store(self.events_unsupported, Ordering::Release);
                Ok(fence)
            }
        }
    }

    fn create_event(&self) -> Result<Arc<CompletionEvent>, DeviceError> {
        match &self.event_error {
            Some(error) => Err(error.clone()),
            None => Ok(Arc::new(CompletionEvent::new())),
        }
    }
}
