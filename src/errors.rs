//! Error Types
//!
//! This module defines the error types used throughout the synchronization layer.
//!
//! # Overview
//!
//! The main error type [`SyncError`] covers:
//! - Initialization failures (event handle, fence object, arena reservation)
//! - Message arena exhaustion
//! - Failures reported by the underlying graphics layer
//!
//! Steady-state fence failures are *not* surfaced as errors: they are logged
//! and reported through [`WaitOutcome`](crate::sync::WaitOutcome) so the frame
//! loop keeps running.
//!
//! ```rust,ignore
//! use myth_sync::errors::{SyncError, Result};
//!
//! fn init_bus() -> Result<MessageBus> {
//!     MessageBus::new(64 * 1024)
//! }
//! ```

use thiserror::Error;

/// Failure reported by the graphics device layer.
///
/// The crate never creates these itself outside of the CPU timeline backend;
/// real backends translate their native error codes into this enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device ran out of memory while creating an object.
    #[error("out of device memory")]
    OutOfMemory,

    /// The device was lost (driver reset, removal, ...).
    #[error("device lost")]
    DeviceLost,

    /// The requested operation is not supported by the backend.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Any other backend-specific failure.
    #[error("{0}")]
    Other(String),
}

/// The main error type for the synchronization layer.
#[derive(Error, Debug)]
pub enum SyncError {
    // ========================================================================
    // Initialization Errors
    // ========================================================================
    /// Creating the CPU wait handle failed.
    #[error("Failed to create completion event: {0}")]
    EventCreate(#[source] DeviceError),

    /// Creating the GPU fence object failed.
    #[error("Failed to create fence: {0}")]
    FenceCreate(#[source] DeviceError),

    /// The message arena was configured with a size of zero.
    #[error("Message arena size must be non-zero")]
    InvalidArenaSize,

    /// The message arena could not be reserved.
    #[error("Failed to reserve message arena of {size} bytes")]
    ArenaReserve {
        /// Requested arena size in bytes
        size: usize,
    },

    // ========================================================================
    // Steady-State Errors
    // ========================================================================
    /// The message arena has no room left for the pushed message.
    #[error(
        "Message arena exhausted: requested {requested} bytes, {remaining} of {capacity} remaining"
    )]
    CapacityExhausted {
        /// Bytes needed by the message (header + payload, aligned)
        requested: usize,
        /// Bytes still free in the current generation
        remaining: usize,
        /// Total arena capacity
        capacity: usize,
    },

    /// Signalling the fence on a queue failed.
    #[error("Queue signal failed: {0}")]
    Signal(#[source] DeviceError),

    /// The component was terminated (or never initialized).
    #[error("{0} is not initialized")]
    NotInitialized(&'static str),

    /// A buffer copy size or offset does not satisfy `wgpu::COPY_BUFFER_ALIGNMENT`.
    #[error("Copy size or offset {value} is not a multiple of the copy alignment")]
    MisalignedCopy {
        /// Offending size or offset in bytes
        value: u64,
    },

    /// The copy destination was not created with `COPY_DST` usage.
    #[error("Copy target buffer lacks COPY_DST usage (has {usage:?})")]
    CopyTargetUsage {
        /// Usage flags the target was created with
        usage: wgpu::BufferUsages,
    },

    /// The copied range does not fit inside the destination buffer.
    #[error("Copy of {size} bytes at offset {offset} exceeds target buffer of {target_size} bytes")]
    CopyOutOfBounds {
        /// Destination offset in bytes
        offset: u64,
        /// Copy size in bytes
        size: u64,
        /// Size of the destination buffer in bytes
        target_size: u64,
    },
}

/// Alias for `Result<T, SyncError>`.
pub type Result<T> = std::result::Result<T, SyncError>;
