use std::sync::Arc;
use std::time::Instant;

use crate::device::{CompletionEvent, GpuDevice, GpuFence, GpuQueue};
use crate::errors::{DeviceError, Result, SyncError};
use crate::settings::WaitTimeout;

/// Result of a [`FenceSync::wait`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The GPU had already reached the target; no blocking wait was issued.
    AlreadyComplete,
    /// The event fired within the timeout.
    Signaled,
    /// The timeout expired before the GPU reached the target.
    TimedOut,
    /// The signal or the event arm failed. The wait was abandoned.
    Failed(DeviceError),
    /// The fence was never initialized or has been terminated.
    Uninitialized,
}

impl WaitOutcome {
    /// `true` if the GPU is known to have reached the target value.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::AlreadyComplete | Self::Signaled)
    }

    /// Converts a device failure into [`SyncError::Signal`]. Every other
    /// outcome is passed through.
    pub fn into_result(self) -> Result<Self> {
        match self {
            Self::Failed(err) => Err(SyncError::Signal(err)),
            outcome => Ok(outcome),
        }
    }
}

struct FenceState<F> {
    fence: F,
    event: Arc<CompletionEvent>,
    next_value: u64,
}

/// CPU/GPU fence synchronization for a single queue.
///
/// Each [`wait`](Self::wait) signals the next counter value on the queue and
/// blocks until the GPU has consumed all work submitted before it.
///
/// `wait` takes `&mut self`: one instance is driven by one thread at a time.
/// Independent queues should use independent instances.
pub struct FenceSync<F: GpuFence> {
    state: Option<FenceState<F>>,
}

impl<F: GpuFence> FenceSync<F> {
    /// Creates the wait handle and a fence starting at zero.
    ///
    /// On failure nothing is retained; the call may simply be retried.
    pub fn new<D>(device: &D) -> Result<Self>
    where
        D: GpuDevice<Fence = F>,
    {
        let event = device.create_event().map_err(SyncError::EventCreate)?;
        let fence = device.create_fence(0).map_err(SyncError::FenceCreate)?;

        log::debug!("FenceSync initialized");

        Ok(Self {
            state: Some(FenceState {
                fence,
                event,
                next_value: 1,
            }),
        })
    }

    /// Signals the next counter value on `queue` and waits for it.
    ///
    /// The counter advances even if the signal fails. Failures are logged and
    /// reported as [`WaitOutcome::Failed`] carrying the device error; they
    /// never abort the frame.
    pub fn wait<Q>(&mut self, queue: &Q, timeout: WaitTimeout) -> WaitOutcome
    where
        Q: GpuQueue<F> + ?Sized,
    {
        let Some(state) = self.state.as_mut() else {
            log::warn!("FenceSync::wait called on an uninitialized fence");
            return WaitOutcome::Uninitialized;
        };

        let target = state.next_value;
        let signal = queue.signal(&state.fence, target);
        state.next_value += 1;

        if let Err(err) = signal {
            log::error!("Fence signal of value {target} failed: {err}");
            return WaitOutcome::Failed(err);
        }

        if state.fence.completed_value() >= target {
            return WaitOutcome::AlreadyComplete;
        }

        state.event.reset();
        if let Err(err) = state.fence.set_event_on_completion(target, &state.event) {
            log::error!("Arming completion event for fence value {target} failed: {err}");
            return WaitOutcome::Failed(err);
        }

        // An event armed by an earlier, timed-out wait may still fire for a
        // lower value, so completion is re-checked after every wake-up.
        let deadline = timeout.as_duration().map(|d| Instant::now() + d);
        loop {
            let fired = state.event.wait_until(deadline);
            if state.fence.completed_value() >= target {
                return WaitOutcome::Signaled;
            }
            if !fired || deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break;
            }
        }

        log::warn!(
            "Fence wait for value {target} timed out after {timeout:?} (completed: {})",
            state.fence.completed_value()
        );
        WaitOutcome::TimedOut
    }

    /// Releases the wait handle and the fence object. Idempotent.
    pub fn term(&mut self) {
        if self.state.take().is_some() {
            log::debug!("FenceSync terminated");
        }
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// The value the next [`wait`](Self::wait) will signal.
    #[must_use]
    pub fn next_value(&self) -> Option<u64> {
        self.state.as_ref().map(|s| s.next_value)
    }

    /// The fence's last completed value as seen from the CPU.
    #[must_use]
    pub fn completed_value(&self) -> Option<u64> {
        self.state.as_ref().map(|s| s.fence.completed_value())
    }

    /// The underlying fence object.
    #[must_use]
    pub fn fence(&self) -> Option<&F> {
        self.state.as_ref().map(|s| &s.fence)
    }
}

impl<F: GpuFence> Drop for FenceSync<F> {
    fn drop(&mut self) {
        self.term();
    }
}
