//! CPU/GPU Synchronization
//!
//! [`FenceSync`] pairs a monotonically increasing counter with a GPU fence and
//! a CPU wait handle. The frame driver calls [`FenceSync::wait`] after queue
//! submission to throttle the CPU against the GPU:
//!
//! ```text
//!  counter:   1        2        3
//!  CPU     ──submit──wait(1)──submit──wait(2)──submit──wait(3)──▶
//!  GPU         └── work ──▶ signal 1   └── work ──▶ signal 2
//! ```
//!
//! When the GPU has already passed the target value the wait returns without
//! arming the event (fast path).

mod fence;

pub use fence::{FenceSync, WaitOutcome};
