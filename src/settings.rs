//! Lifetime & Synchronization Settings
//!
//! Deployment-time knobs for the frame synchronization layer. Everything here
//! is plain data and can be loaded from any serde format.
//!
//! ```rust,ignore
//! use myth_sync::settings::{LifetimeSettings, UploadConcurrency, WaitTimeout};
//!
//! let settings = LifetimeSettings {
//!     resource_lifetime: 2,
//!     fence_timeout: WaitTimeout::Millis(500),
//!     upload_concurrency: UploadConcurrency::Serialized,
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of frame boundaries a retired object survives.
///
/// Matches the usual triple-buffered frame pipeline.
pub const DEFAULT_FRAME_LIFETIME: i32 = 3;

/// Default message arena size (64 KiB).
pub const DEFAULT_MESSAGE_ARENA_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// WaitTimeout
// ---------------------------------------------------------------------------

/// How long a CPU thread may block on a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WaitTimeout {
    /// Block until the event is signalled.
    #[default]
    Infinite,
    /// Block for at most the given number of milliseconds.
    Millis(u32),
}

impl WaitTimeout {
    /// Converts a raw millisecond count. `u32::MAX` means "wait forever",
    /// following the OS convention.
    #[inline]
    #[must_use]
    pub fn from_millis(ms: u32) -> Self {
        if ms == u32::MAX {
            Self::Infinite
        } else {
            Self::Millis(ms)
        }
    }

    /// Returns the timeout as a [`Duration`], or `None` for infinite waits.
    #[inline]
    #[must_use]
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Self::Infinite => None,
            Self::Millis(ms) => Some(Duration::from_millis(u64::from(ms))),
        }
    }
}

// ---------------------------------------------------------------------------
// UploadConcurrency
// ---------------------------------------------------------------------------

/// Concurrency contract of the [`StagingUploader`](crate::upload::StagingUploader).
///
/// `push` is always safe from any thread. This flag only governs the driver
/// side (`upload` / `clear`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UploadConcurrency {
    /// A single frame-driver thread calls `upload`, `frame_sync` and `clear`.
    /// No drain lock is taken.
    #[default]
    FrameDriver,
    /// Any thread may drive uploads. A drain lock keeps FIFO order intact
    /// across concurrent `upload` calls.
    Serialized,
}

// ---------------------------------------------------------------------------
// LifetimeSettings
// ---------------------------------------------------------------------------

/// Configuration for [`FrameSyncContext`](crate::frame::FrameSyncContext).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifetimeSettings {
    /// Frames a retired GPU resource survives before release.
    pub resource_lifetime: i32,
    /// Frames a retired generic disposable survives before release.
    pub disposable_lifetime: i32,
    /// Frames a staging buffer survives after its copy was recorded.
    pub upload_lifetime: i32,
    /// Capacity of the per-frame message arena in bytes. Never grows.
    pub message_arena_size: usize,
    /// Timeout used for the per-frame fence wait.
    pub fence_timeout: WaitTimeout,
    /// Driver-side concurrency contract for staging uploads.
    pub upload_concurrency: UploadConcurrency,
}

impl Default for LifetimeSettings {
    fn default() -> Self {
        Self {
            resource_lifetime: DEFAULT_FRAME_LIFETIME,
            disposable_lifetime: DEFAULT_FRAME_LIFETIME,
            upload_lifetime: DEFAULT_FRAME_LIFETIME,
            message_arena_size: DEFAULT_MESSAGE_ARENA_SIZE,
            fence_timeout: WaitTimeout::Infinite,
            upload_concurrency: UploadConcurrency::FrameDriver,
        }
    }
}
