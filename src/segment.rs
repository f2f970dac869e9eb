//! Memory segment trait and the injected allocation capability.

use crate::error::Result;
use rustix::fd::OwnedFd;
use std::sync::Arc;

/// A duplicated handle to a buffer's shared memory.
///
/// The fd is an independent duplicate: it stays valid after the pool evicts
/// the buffer, and closes when this handle is dropped. Send it to another
/// process via `SCM_RIGHTS` over a Unix socket; the receiver maps it with
/// [`SharedMemorySegment::from_fd`](crate::shared::SharedMemorySegment::from_fd).
#[derive(Debug)]
pub struct SharedBufferHandle {
    /// Duplicated file descriptor, owned by the recipient of this handle.
    pub fd: OwnedFd,
    /// Size of the memory region in bytes.
    pub size: usize,
}

/// Trait for memory segment backends.
///
/// A memory segment is a contiguous, fixed-size region of memory backing one
/// pooled buffer. A segment's size never changes in place; the pool mints a
/// new buffer (and a new id) whenever a different size is needed.
///
/// # Safety
///
/// Implementations must ensure that:
/// - Pointers remain valid for the lifetime of the segment
/// - Thread-safety requirements are met (Send + Sync)
pub trait MemorySegment: Send + Sync {
    /// Get a raw pointer to the start of this segment.
    fn as_ptr(&self) -> *const u8;

    /// Get a mutable pointer to the start of this segment.
    ///
    /// Returns `None` if the segment is read-only.
    fn as_mut_ptr(&self) -> Option<*mut u8>;

    /// Total size of the segment in bytes.
    fn len(&self) -> usize;

    /// Returns true if the segment has zero length.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duplicate this segment's handle for another process.
    ///
    /// Returns [`Error::NotShareable`](crate::error::Error::NotShareable) if
    /// the backing memory cannot cross a process boundary (heap segments).
    fn duplicate_handle(&self) -> Result<SharedBufferHandle>;

    /// Get the segment as a byte slice.
    ///
    /// # Safety
    ///
    /// The caller must ensure no mutable references exist to this memory.
    unsafe fn as_slice(&self) -> &[u8] {
        // SAFETY: Caller guarantees no mutable references exist.
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len()) }
    }

    /// Get the segment as a mutable byte slice.
    ///
    /// # Safety
    ///
    /// The caller must ensure exclusive access to this memory. This returns
    /// a mutable reference from `&self` because the underlying memory may be
    /// mutable even when the segment handle is shared (e.g. a mapped region
    /// visible to another process). Callers must ensure proper
    /// synchronization.
    #[allow(clippy::mut_from_ref)]
    unsafe fn as_mut_slice(&self) -> Option<&mut [u8]> {
        // SAFETY: Caller guarantees exclusive access.
        self.as_mut_ptr()
            .map(|ptr| unsafe { std::slice::from_raw_parts_mut(ptr, self.len()) })
    }
}

/// Allocation capability injected into the pool.
///
/// The pool never calls a platform API directly; it asks its provider for a
/// segment of exactly the requested size. This keeps the arbitration logic
/// portable and testable without real shared memory.
pub trait SegmentProvider: Send + Sync {
    /// Allocate a segment of exactly `size` bytes.
    ///
    /// `name` is a per-buffer debug label (visible in `/proc/self/fd/` for
    /// memfd-backed segments). Providers may ignore it.
    fn allocate(&self, name: &str, size: usize) -> Result<Arc<dyn MemorySegment>>;
}

/// Extension methods for Arc<dyn MemorySegment>.
impl dyn MemorySegment {
    /// Check if this segment can be shared with other processes.
    pub fn is_shareable(&self) -> bool {
        self.duplicate_handle().is_ok()
    }
}
