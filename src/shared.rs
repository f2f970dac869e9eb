//! Shared memory segment using Linux memfd.
//!
//! Buffers handed to out-of-process consumers are backed by anonymous shared
//! memory created via `memfd_create`. A consumer receives a duplicated file
//! descriptor over a Unix socket and maps the same physical pages, so frame
//! data crosses the process boundary without a copy.

use crate::error::{Error, Result};
use crate::segment::{MemorySegment, SegmentProvider, SharedBufferHandle};
use rustix::fd::{AsFd, BorrowedFd, OwnedFd};
use rustix::mm::{MapFlags, ProtFlags};
use std::ffi::CString;
use std::os::unix::io::{AsRawFd, RawFd};
use std::ptr::NonNull;
use std::sync::Arc;

/// A memory segment backed by Linux memfd (anonymous shared memory).
///
/// # Features
///
/// - Anonymous: No filesystem visibility (unlike `shm_open`)
/// - Auto-cleanup: Kernel reclaims memory when all references are closed
/// - Duplicable: `duplicate_handle` yields an independent fd for consumers
///
/// # Example
///
/// ```rust,ignore
/// use framepool::shared::SharedMemorySegment;
/// use framepool::segment::MemorySegment;
///
/// // Create a 1MB shared memory segment
/// let segment = SharedMemorySegment::new("frame-0", 1024 * 1024)?;
///
/// // Duplicate the handle to share with another process
/// let handle = segment.duplicate_handle()?;
/// // Send handle.fd over a Unix socket...
/// ```
pub struct SharedMemorySegment {
    /// The memfd file descriptor.
    fd: OwnedFd,
    /// Pointer to the mmap'd region.
    ptr: NonNull<u8>,
    /// Size of the segment.
    len: usize,
    /// Optional name (for debugging).
    name: Option<String>,
}

impl SharedMemorySegment {
    /// Create a new shared memory segment.
    ///
    /// # Arguments
    ///
    /// * `name` - Debug name for the segment (visible in `/proc/self/fd/`).
    /// * `size` - Size in bytes. Must be greater than 0.
    ///
    /// # Errors
    ///
    /// Returns an error if `memfd_create`, `ftruncate`, or `mmap` fails.
    pub fn new(name: &str, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::AllocationFailed(
                "size must be greater than 0".into(),
            ));
        }

        // Create anonymous memfd
        let cname = CString::new(name).map_err(|e| Error::AllocationFailed(e.to_string()))?;
        let fd = rustix::fs::memfd_create(&cname, rustix::fs::MemfdFlags::CLOEXEC)?;

        // Set the size
        rustix::fs::ftruncate(&fd, size as u64)?;

        // Memory-map the region
        let ptr = unsafe {
            rustix::mm::mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                &fd,
                0,
            )?
        };

        let ptr = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| Error::AllocationFailed("mmap returned null".into()))?;

        Ok(Self {
            fd,
            ptr,
            len: size,
            name: Some(name.to_string()),
        })
    }

    /// Open an existing shared memory segment from a file descriptor.
    ///
    /// This is the consumer side: after receiving a duplicated fd (from
    /// [`SharedBufferHandle`]) over `SCM_RIGHTS`, map the same pages here.
    ///
    /// # Arguments
    ///
    /// * `fd` - File descriptor of the memfd.
    /// * `size` - Expected size of the segment.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `fd` is a valid memfd and that `size`
    /// matches the actual size of the memfd.
    pub unsafe fn from_fd(fd: OwnedFd, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::AllocationFailed(
                "size must be greater than 0".into(),
            ));
        }

        // Memory-map the region
        let ptr = unsafe {
            rustix::mm::mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                &fd,
                0,
            )?
        };

        let ptr = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| Error::AllocationFailed("mmap returned null".into()))?;

        Ok(Self {
            fd,
            ptr,
            len: size,
            name: None,
        })
    }

    /// Get the raw file descriptor.
    pub fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Get the debug name of this segment.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl MemorySegment for SharedMemorySegment {
    fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    fn as_mut_ptr(&self) -> Option<*mut u8> {
        Some(self.ptr.as_ptr())
    }

    fn len(&self) -> usize {
        self.len
    }

    fn duplicate_handle(&self) -> Result<SharedBufferHandle> {
        let fd = rustix::io::fcntl_dupfd_cloexec(&self.fd, 0)?;
        Ok(SharedBufferHandle { fd, size: self.len })
    }
}

impl Drop for SharedMemorySegment {
    fn drop(&mut self) {
        // Unmap the memory region
        unsafe {
            let _ = rustix::mm::munmap(self.ptr.as_ptr().cast(), self.len);
        }
        // fd is automatically closed when OwnedFd is dropped
    }
}

// SAFETY: SharedMemorySegment is Send + Sync because:
// - The memory is shared and can be accessed from any thread
// - The fd is reference-counted by the kernel
// - We don't hold any thread-local state
unsafe impl Send for SharedMemorySegment {}
unsafe impl Sync for SharedMemorySegment {}

impl AsFd for SharedMemorySegment {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

/// Provider allocating memfd-backed segments.
///
/// This is the production [`SegmentProvider`]: every buffer the pool mints is
/// immediately shareable with consumer processes.
pub struct MemfdProvider {
    /// Prefix for segment debug names.
    prefix: String,
}

impl MemfdProvider {
    /// Create a provider whose segments are named `<prefix>-<buffer name>`.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }
}

impl SegmentProvider for MemfdProvider {
    fn allocate(&self, name: &str, size: usize) -> Result<Arc<dyn MemorySegment>> {
        let full_name = format!("{}-{}", self.prefix, name);
        Ok(Arc::new(SharedMemorySegment::new(&full_name, size)?))
    }
}
