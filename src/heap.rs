//! Heap-backed memory segment.

use crate::error::{Error, Result};
use crate::segment::{MemorySegment, SegmentProvider, SharedBufferHandle};
use std::sync::Arc;

/// A memory segment backed by heap allocation.
///
/// This is the simplest memory backend, suitable for single-process use and
/// for exercising the pool's arbitration logic in tests and benchmarks
/// without real shared memory. It does not support cross-process sharing.
///
/// # Example
///
/// ```rust
/// use framepool::heap::HeapSegment;
/// use framepool::segment::MemorySegment;
///
/// let segment = HeapSegment::new(1024).unwrap();
/// assert_eq!(segment.len(), 1024);
/// ```
pub struct HeapSegment {
    /// The underlying memory allocation.
    /// Using a boxed slice ensures the memory is contiguous and won't be reallocated.
    data: Box<[u8]>,
}

impl HeapSegment {
    /// Create a new heap segment with the given size.
    ///
    /// The memory is zero-initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if size is 0.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::AllocationFailed(
                "size must be greater than 0".into(),
            ));
        }

        // Allocate zeroed memory
        let data = vec![0u8; size].into_boxed_slice();

        Ok(Self { data })
    }
}

impl MemorySegment for HeapSegment {
    fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    fn as_mut_ptr(&self) -> Option<*mut u8> {
        // We have exclusive ownership, so we can provide mutable access.
        // This is safe because HeapSegment is not Clone.
        Some(self.data.as_ptr() as *mut u8)
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn duplicate_handle(&self) -> Result<SharedBufferHandle> {
        // Heap memory cannot cross a process boundary.
        Err(Error::NotShareable)
    }
}

/// Provider allocating heap-backed segments.
///
/// For tests and benchmarks; buffers from this provider cannot be shared
/// with other processes.
#[derive(Default)]
pub struct HeapProvider;

impl HeapProvider {
    /// Create a new heap provider.
    pub fn new() -> Self {
        Self
    }
}

impl SegmentProvider for HeapProvider {
    fn allocate(&self, _name: &str, size: usize) -> Result<Arc<dyn MemorySegment>> {
        Ok(Arc::new(HeapSegment::new(size)?))
    }
}
