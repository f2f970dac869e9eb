//! # framepool
//!
//! A bounded pool of reusable shared-memory buffers for zero-copy frame
//! capture.
//!
//! A single in-process producer (a capture source) reserves a buffer, fills
//! it, and hands it to any number of out-of-process consumers. Consumers map
//! the buffer via a duplicated memfd handle and read it without copying.
//! The pool never allocates more than `capacity` buffers at once, grows
//! buffer size on demand by evicting unreferenced buffers, and guarantees a
//! buffer is never reused while any party still references it.
//!
//! ## Features
//!
//! - **Bounded memory**: at most `capacity` buffers allocated at any time
//! - **Zero-copy sharing**: buffers are memfd-backed, shareable via fd passing
//! - **Transparent growth**: larger frames evict free, undersized buffers
//! - **Backpressure**: reservation fails immediately when exhausted; the
//!   producer drops the frame or retries on the next tick
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use framepool::prelude::*;
//!
//! // Pool of up to 4 shared-memory buffers.
//! let pool = FramePool::with_shared_memory(4)?;
//!
//! // Producer: reserve, write, hand off to two consumers.
//! let reservation = pool.reserve_for_producer(frame_size).expect("pool exhausted");
//! let info = pool.buffer_info(reservation.buffer_id).unwrap();
//! // ... write pixel data through info.segment ...
//! pool.hold_for_consumers(reservation.buffer_id, 2)?;
//!
//! // Send a duplicated handle to each consumer process.
//! let handle = pool.share_handle(reservation.buffer_id)?;
//!
//! // Each consumer acknowledgement releases one hold.
//! pool.relinquish_consumer_hold(reservation.buffer_id, 1)?;
//! pool.relinquish_consumer_hold(reservation.buffer_id, 1)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod heap;
pub mod observability;
pub mod pool;
pub mod segment;
pub mod shared;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::pool::{BufferId, BufferInfo, FramePool, PoolStats, Reservation};
    pub use crate::segment::{MemorySegment, SegmentProvider, SharedBufferHandle};
}

pub use error::{Error, Result};
pub use pool::{BufferId, FramePool, Reservation};
