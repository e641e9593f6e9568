//! Frame Synchronization Context
//!
//! [`FrameSyncContext`] is the explicit owner of the lifetime and messaging
//! components for one queue. It replaces ambient globals: the application
//! builds it once and hands references to the systems that need it.
//!
//! # Lifecycle
//!
//! 1. Create with [`FrameSyncContext::new`]
//! 2. During the frame: retire objects, queue uploads, push messages,
//!    record uploads with [`FrameSyncContext::record_uploads`]
//! 3. After submission: [`FrameSyncContext::end_frame`]
//! 4. On exit: [`FrameSyncContext::shutdown`]

use std::any::Any;

use crate::bus::MessageBus;
use crate::device::{GpuDevice, GpuFence, GpuQueue};
use crate::errors::Result;
use crate::reclaim::{DisposableReclaimer, ResourceReclaimer};
use crate::settings::{LifetimeSettings, WaitTimeout};
use crate::sync::{FenceSync, WaitOutcome};
use crate::upload::{StagingUploader, Upload};

/// Type-erased object retired through the hot-path reclaimer.
pub type Disposable = Box<dyn Any + Send>;

/// What happened during one [`FrameSyncContext::end_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStats {
    /// Index of the frame that just ended.
    pub frame_index: u64,
    pub fence: WaitOutcome,
    pub disposables_released: usize,
    pub resources_released: usize,
    pub uploads_released: usize,
    pub messages_delivered: usize,
}

/// Owns the fence, the reclaimers, the staging uploader and the message bus
/// of one queue.
///
/// - `F`: fence type of the device layer
/// - `R`: retired GPU resource type (usually a `wgpu` handle or an `Arc`)
/// - `U`: staging upload request type
pub struct FrameSyncContext<F: GpuFence, R, U> {
    settings: LifetimeSettings,
    fence: FenceSync<F>,
    disposables: DisposableReclaimer<Disposable>,
    resources: ResourceReclaimer<R>,
    uploads: StagingUploader<U>,
    bus: MessageBus,
    frame_index: u64,
    shut_down: bool,
}

impl<F: GpuFence, R, U> FrameSyncContext<F, R, U> {
    pub fn new<D>(device: &D, settings: LifetimeSettings) -> Result<Self>
    where
        D: GpuDevice<Fence = F>,
    {
        let fence = FenceSync::new(device)?;
        let bus = MessageBus::new(settings.message_arena_size)?;

        Ok(Self {
            uploads: StagingUploader::new(settings.upload_concurrency),
            settings,
            fence,
            disposables: DisposableReclaimer::new(),
            resources: ResourceReclaimer::new(),
            bus,
            frame_index: 0,
            shut_down: false,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &LifetimeSettings {
        &self.settings
    }

    /// Index of the frame currently being recorded.
    #[inline]
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    // ── Retirement ──────────────────────────────────────────────────────────

    /// Keeps `object` alive for the configured disposable lifetime.
    pub fn retire_disposable<T: Any + Send>(&self, object: T) {
        let object: Disposable = Box::new(object);
        self.disposables
            .push(Some(object), self.settings.disposable_lifetime);
    }

    /// Keeps `resource` alive for the configured resource lifetime.
    pub fn retire_resource(&self, resource: R) {
        self.resources
            .push(Some(resource), self.settings.resource_lifetime);
    }

    /// Queues a staging upload with the configured upload lifetime.
    pub fn queue_upload(&self, upload: U) {
        self.uploads.push(Some(upload), self.settings.upload_lifetime);
    }

    /// Records all pending uploads into `commands`.
    pub fn record_uploads<C>(&self, commands: &mut C) -> usize
    where
        C: ?Sized,
        U: Upload<C>,
    {
        self.uploads.upload(commands)
    }

    // ── Component access ────────────────────────────────────────────────────

    #[must_use]
    pub fn disposables(&self) -> &DisposableReclaimer<Disposable> {
        &self.disposables
    }

    #[must_use]
    pub fn resources(&self) -> &ResourceReclaimer<R> {
        &self.resources
    }

    #[must_use]
    pub fn uploads(&self) -> &StagingUploader<U> {
        &self.uploads
    }

    #[must_use]
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut MessageBus {
        &mut self.bus
    }

    #[must_use]
    pub fn fence(&self) -> &FenceSync<F> {
        &self.fence
    }

    // ── Frame boundary ──────────────────────────────────────────────────────

    /// Ends the current frame: waits on the fence, sweeps every lifetime list
    /// and broadcasts queued messages.
    pub fn end_frame<Q>(&mut self, queue: &Q) -> FrameStats
    where
        Q: GpuQueue<F> + ?Sized,
    {
        let fence = self.fence.wait(queue, self.settings.fence_timeout);

        let stats = FrameStats {
            frame_index: self.frame_index,
            fence,
            disposables_released: self.disposables.frame_sync(),
            resources_released: self.resources.frame_sync(),
            uploads_released: self.uploads.frame_sync(),
            messages_delivered: self.bus.broadcast(),
        };

        self.frame_index += 1;
        stats
    }

    /// Waits for the GPU to go idle, force-releases every lifetime list and
    /// terminates the bus and the fence. Idempotent.
    pub fn shutdown<Q>(&mut self, queue: &Q)
    where
        Q: GpuQueue<F> + ?Sized,
    {
        if self.shut_down {
            return;
        }

        let outcome = self.fence.wait(queue, WaitTimeout::Infinite);
        if !outcome.is_complete() {
            log::warn!("Shutting down without a confirmed GPU idle ({outcome:?})");
        }

        let released = self.disposables.clear() + self.resources.clear() + self.uploads.clear();
        log::debug!("FrameSyncContext shutdown released {released} object(s)");

        self.bus.term();
        self.fence.term();
        self.shut_down = true;
    }
}
