#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! # Myth Sync
//!
//! Resource-lifetime and synchronization substrate of the Myth engine.
//!
//! - [`sync`]: CPU/GPU fence synchronization ([`FenceSync`])
//! - [`reclaim`]: frame-lifetime-counted deferred release ([`DeferredReclaimer`])
//! - [`upload`]: staging upload pipeline ([`StagingUploader`])
//! - [`bus`]: arena-backed message bus ([`MessageBus`])
//! - [`frame`]: the per-queue context tying them together ([`FrameSyncContext`])
//! - [`device`]: the narrow graphics-device seam, plus a CPU timeline backend

pub mod bus;
pub mod device;
pub mod errors;
pub mod frame;
pub mod reclaim;
pub mod settings;
pub mod sync;
pub mod upload;

pub use bus::{Listener, ListenerKey, Message, MessageBus, MessageType};
pub use device::{CompletionEvent, GpuDevice, GpuFence, GpuQueue};
pub use errors::{DeviceError, Result, SyncError};
pub use frame::{FrameStats, FrameSyncContext};
pub use reclaim::{DeferredReclaimer, DisposableReclaimer, ResourceReclaimer};
pub use settings::{LifetimeSettings, UploadConcurrency, WaitTimeout};
pub use sync::{FenceSync, WaitOutcome};
pub use upload::{BufferUpload, StagingUploader, Upload, UploadSender};
