//! Graphics Device Seam
//!
//! The synchronization layer does not own a graphics API. It consumes a few
//! narrow capabilities from whatever device layer the engine runs on:
//!
//! - [`GpuQueue`]: enqueue a fence signal behind previously submitted work
//! - [`GpuFence`]: query the completed value, arm a CPU event on completion
//! - [`GpuDevice`]: create fences and CPU wait handles
//!
//! [`timeline`] provides a CPU-only implementation of these traits. It is used
//! by the test-suite and by headless runs where no adapter is available.

mod event;
pub mod timeline;

use std::sync::Arc;

use crate::errors::DeviceError;

pub use event::CompletionEvent;
pub use timeline::{RetireMode, TimelineDevice, TimelineFence, TimelineQueue};

/// A GPU-visible monotonic counter.
pub trait GpuFence: Send + Sync {
    /// The last value the GPU has reached. Never decreases.
    fn completed_value(&self) -> u64;

    /// Arms `event` to be set once the fence reaches `value`.
    ///
    /// If the value has already been reached the event is set immediately.
    fn set_event_on_completion(
        &self,
        value: u64,
        event: &Arc<CompletionEvent>,
    ) -> Result<(), DeviceError>;
}

/// An execution queue that can signal a fence after all prior work.
pub trait GpuQueue<F: GpuFence + ?Sized> {
    /// Enqueues a signal of `value` on `fence`.
    fn signal(&self, fence: &F, value: u64) -> Result<(), DeviceError>;
}

/// Factory for fence objects and their CPU wait handles.
pub trait GpuDevice {
    type Fence: GpuFence;

    /// Creates a fence whose completed value starts at `initial_value`.
    fn create_fence(&self, initial_value: u64) -> Result<Self::Fence, DeviceError>;

    /// Creates the CPU wait handle paired with a fence.
    fn create_event(&self) -> Result<Arc<CompletionEvent>, DeviceError> {
        Ok(Arc::new(CompletionEvent::new()))
    }
}
