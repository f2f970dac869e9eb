//! Bounded pool of reusable frame buffers.
//!
//! The pool arbitrates access to at most `capacity` memory segments between
//! a single producer (the capture source) and any number of consumers
//! (out-of-process readers). The producer reserves a buffer, writes a frame
//! into it, and either discards the reservation or transfers ownership to a
//! known number of consumers. A buffer returns to the free set only when the
//! producer discards it or the last consumer releases its hold.
//!
//! # Growth
//!
//! Buffer sizes are fixed at allocation time. When the producer asks for a
//! size no free buffer can satisfy and the pool is at capacity, the pool
//! retires a free buffer and allocates a replacement under a fresh id. Ids
//! are minted monotonically and never reused, so a stale id held downstream
//! is unambiguously detectable. After a short warm-up at a steady frame
//! size, every reservation is satisfied by reuse and the pool performs zero
//! allocations.
//!
//! # Backpressure
//!
//! Reservation never waits for a buffer to free up. When every buffer is
//! reserved or held and the pool is at capacity, [`FramePool::reserve_for_producer`]
//! returns `None` and the caller drops the frame or retries on a later tick.
//!
//! # Example
//!
//! ```rust
//! use framepool::pool::FramePool;
//!
//! let pool = FramePool::with_heap_memory(2).unwrap();
//!
//! let r = pool.reserve_for_producer(4096).unwrap();
//! pool.hold_for_consumers(r.buffer_id, 2).unwrap();
//! pool.relinquish_consumer_hold(r.buffer_id, 2).unwrap();
//!
//! // The buffer is free again; the same segment is recycled.
//! let r2 = pool.reserve_for_producer(4096).unwrap();
//! assert_eq!(r2.buffer_id, r.buffer_id);
//! ```

use crate::error::{Error, Result};
use crate::heap::HeapProvider;
use crate::observability;
use crate::segment::{MemorySegment, SegmentProvider, SharedBufferHandle};
use crate::shared::MemfdProvider;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, warn};

/// Identifier of a pooled buffer.
///
/// Ids are minted from a monotonically increasing counter and never reused,
/// even across eviction. Once a buffer is retired its id is permanently
/// invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of a successful producer reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    /// The reserved buffer. The producer holds exclusive write access until
    /// it relinquishes the reservation or hands the buffer to consumers.
    pub buffer_id: BufferId,
    /// Id retired to make room for this allocation, if any. The caller must
    /// invalidate any shared-memory handles it previously distributed for
    /// this id.
    pub evicted: Option<BufferId>,
}

/// Local view of a buffer, for the producer while it holds the reservation.
#[derive(Clone)]
pub struct BufferInfo {
    /// The buffer's backing memory.
    pub segment: Arc<dyn MemorySegment>,
    /// Size of the segment in bytes.
    pub size: usize,
}

/// Snapshot of pool usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Maximum number of simultaneously allocated buffers.
    pub capacity: usize,
    /// Buffers currently allocated.
    pub allocated: usize,
    /// Allocated buffers that are currently free.
    pub free: usize,
    /// Total producer reservation attempts.
    pub reservations: u64,
    /// Reservations satisfied by recycling a free buffer.
    pub reuses: u64,
    /// New segments allocated.
    pub allocations: u64,
    /// Free buffers retired to make room for larger allocations.
    pub evictions: u64,
    /// Reservations that failed because no buffer was free at capacity.
    pub exhaustions: u64,
}

/// Per-buffer ownership state.
///
/// The enum makes the exclusivity invariant structural: a buffer is either
/// being written or being read, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferState {
    /// No outstanding references; eligible for reuse or eviction.
    Free,
    /// The producer holds an exclusive write reservation.
    Reserved,
    /// Some number of consumers hold read references.
    Held {
        /// Outstanding consumer references; always at least 1.
        consumers: u32,
    },
}

struct TrackedBuffer {
    segment: Arc<dyn MemorySegment>,
    /// Size fixed at allocation; a size change always mints a new buffer.
    size: usize,
    state: BufferState,
}

#[derive(Default)]
struct Counters {
    reservations: u64,
    reuses: u64,
    allocations: u64,
    evictions: u64,
    exhaustions: u64,
}

struct PoolState {
    buffers: HashMap<BufferId, TrackedBuffer>,
    next_id: u64,
    counters: Counters,
}

/// A bounded pool of reusable frame buffers.
///
/// The entire pool state sits behind one mutex. Every public operation holds
/// it for its full duration, none block on I/O or on another thread's
/// release, and all are O(capacity). Operations on different buffer ids may
/// interleave freely; operations on the same id are totally ordered by the
/// lock.
///
/// Share the pool between the capture thread and I/O threads as
/// `Arc<FramePool>`.
pub struct FramePool {
    capacity: usize,
    provider: Arc<dyn SegmentProvider>,
    state: Mutex<PoolState>,
}

impl FramePool {
    /// Create a pool with an injected segment provider.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum simultaneously allocated buffers. Must be > 0.
    /// * `provider` - Allocation capability for segment memory.
    pub fn new(capacity: usize, provider: Arc<dyn SegmentProvider>) -> Result<Arc<Self>> {
        if capacity == 0 {
            return Err(Error::AllocationFailed("capacity must be > 0".into()));
        }
        Ok(Arc::new(Self {
            capacity,
            provider,
            state: Mutex::new(PoolState {
                buffers: HashMap::new(),
                next_id: 0,
                counters: Counters::default(),
            }),
        }))
    }

    /// Create a pool backed by memfd shared memory.
    ///
    /// Buffers from this pool can be shared with consumer processes via
    /// [`FramePool::share_handle`].
    pub fn with_shared_memory(capacity: usize) -> Result<Arc<Self>> {
        Self::new(capacity, Arc::new(MemfdProvider::new("framepool")))
    }

    /// Create a pool backed by heap memory (single-process only).
    pub fn with_heap_memory(capacity: usize) -> Result<Arc<Self>> {
        Self::new(capacity, Arc::new(HeapProvider::new()))
    }

    /// Reserve a buffer of at least `size` bytes for the producer.
    ///
    /// In order of preference:
    /// 1. recycle the smallest free buffer of sufficient size (ties broken
    ///    by lowest id);
    /// 2. allocate a new buffer of exactly `size` bytes if below capacity;
    /// 3. retire the free buffer that least wastes memory after growth
    ///    (smallest first, ties by oldest id), allocate a replacement under
    ///    a fresh id, and report the retired id in
    ///    [`Reservation::evicted`].
    ///
    /// Returns `None` when every buffer is reserved or held and the pool is
    /// at capacity. This is backpressure, not an error; drop the frame or
    /// retry on a later tick.
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn reserve_for_producer(&self, size: usize) -> Option<Reservation> {
        assert!(size > 0, "reservation size must be greater than 0");

        let mut state = self.state.lock().unwrap();
        state.counters.reservations += 1;
        observability::record_reservation();

        // 1. Recycle a free buffer that is already large enough. Taking the
        // smallest sufficient one leaves bigger buffers for bigger frames
        // and converges the working set toward the current frame size.
        if let Some(id) = best_free(&state.buffers, |buffer_size| buffer_size >= size) {
            let buffer = state
                .buffers
                .get_mut(&id)
                .expect("free buffer vanished under the pool lock");
            buffer.state = BufferState::Reserved;
            state.counters.reuses += 1;
            observability::record_reuse();
            trace!(buffer = %id, size, "recycled free buffer");
            return Some(Reservation {
                buffer_id: id,
                evicted: None,
            });
        }

        // 2. Below capacity: allocate a fresh buffer of exactly `size` bytes.
        if state.buffers.len() < self.capacity {
            return match self.allocate_locked(&mut state, size) {
                Ok(id) => Some(Reservation {
                    buffer_id: id,
                    evicted: None,
                }),
                Err(err) => {
                    warn!(size, %err, "buffer allocation failed");
                    None
                }
            };
        }

        // 3. At capacity: every free buffer is undersized (a sufficient one
        // would have matched above). Retire the smallest, ties by oldest id.
        if let Some(victim) = best_free(&state.buffers, |_| true) {
            let retired = state
                .buffers
                .remove(&victim)
                .expect("free buffer vanished under the pool lock");
            debug_assert!(retired.size < size);
            state.counters.evictions += 1;
            observability::record_eviction(retired.size);
            debug!(buffer = %victim, old_size = retired.size, new_size = size, "evicted undersized buffer");

            return match self.allocate_locked(&mut state, size) {
                Ok(id) => Some(Reservation {
                    buffer_id: id,
                    evicted: Some(victim),
                }),
                Err(err) => {
                    // The victim is already retired; the pool simply shrank
                    // by one buffer and the caller drops this frame.
                    warn!(size, %err, "replacement allocation failed after eviction");
                    None
                }
            };
        }

        // 4. Exhausted: all buffers are producer- or consumer-held.
        state.counters.exhaustions += 1;
        observability::record_reservation_failure();
        warn!(size, capacity = self.capacity, "pool exhausted, dropping reservation");
        None
    }

    /// Discard a producer reservation without handing the buffer off.
    ///
    /// The buffer becomes free and eligible for reuse or eviction.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not currently reserved by the producer.
    pub fn relinquish_producer_reservation(&self, id: BufferId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let buffer = lookup_mut(&mut state.buffers, id)?;
        assert!(
            buffer.state == BufferState::Reserved,
            "buffer {id} relinquished without a producer reservation"
        );
        buffer.state = BufferState::Free;
        trace!(buffer = %id, "producer reservation relinquished");
        Ok(())
    }

    /// Transfer ownership of a reserved buffer to `num_clients` consumers.
    ///
    /// This is the sole transfer point from producer to consumers: the
    /// producer's reservation ends and `num_clients` holds begin in one
    /// atomic step under the pool lock.
    ///
    /// # Panics
    ///
    /// Panics if `num_clients` is 0 or the buffer is not currently reserved
    /// by the producer.
    pub fn hold_for_consumers(&self, id: BufferId, num_clients: u32) -> Result<()> {
        assert!(num_clients >= 1, "a consumer hold needs at least one client");
        let mut state = self.state.lock().unwrap();
        let buffer = lookup_mut(&mut state.buffers, id)?;
        assert!(
            buffer.state == BufferState::Reserved,
            "buffer {id} handed to consumers without a producer reservation"
        );
        buffer.state = BufferState::Held {
            consumers: num_clients,
        };
        trace!(buffer = %id, num_clients, "ownership transferred to consumers");
        Ok(())
    }

    /// Release `num_clients` consumer holds on a buffer.
    ///
    /// When the outstanding count reaches 0 the buffer becomes free.
    ///
    /// # Panics
    ///
    /// Panics if `num_clients` is 0, exceeds the outstanding count, or the
    /// buffer has no consumer holds. Clamping the count instead would mask a
    /// use-after-free on the shared memory.
    pub fn relinquish_consumer_hold(&self, id: BufferId, num_clients: u32) -> Result<()> {
        assert!(num_clients >= 1, "must release at least one consumer hold");
        let mut state = self.state.lock().unwrap();
        let buffer = lookup_mut(&mut state.buffers, id)?;
        let consumers = match buffer.state {
            BufferState::Held { consumers } => consumers,
            _ => panic!("buffer {id} has no outstanding consumer holds"),
        };
        assert!(
            num_clients <= consumers,
            "released {num_clients} consumer holds on buffer {id} but only {consumers} outstanding"
        );
        let remaining = consumers - num_clients;
        buffer.state = if remaining == 0 {
            BufferState::Free
        } else {
            BufferState::Held {
                consumers: remaining,
            }
        };
        trace!(buffer = %id, released = num_clients, remaining, "consumer holds released");
        Ok(())
    }

    /// Duplicate a buffer's shared-memory handle for another process.
    ///
    /// The handle is an independent fd: send it over a Unix socket via
    /// `SCM_RIGHTS` and it stays valid in the receiver even after the pool
    /// evicts the buffer. Buffer state is unchanged; this is a read-only,
    /// idempotent query.
    pub fn share_handle(&self, id: BufferId) -> Result<SharedBufferHandle> {
        let state = self.state.lock().unwrap();
        let buffer = state.buffers.get(&id).ok_or(Error::UnknownBuffer(id))?;
        buffer.segment.duplicate_handle()
    }

    /// Get the local memory and size of a buffer.
    ///
    /// Used by the producer to write frame data while it holds the
    /// reservation. Returns `None` for retired or never-allocated ids.
    pub fn buffer_info(&self, id: BufferId) -> Option<BufferInfo> {
        let state = self.state.lock().unwrap();
        state.buffers.get(&id).map(|buffer| BufferInfo {
            segment: Arc::clone(&buffer.segment),
            size: buffer.size,
        })
    }

    /// Maximum number of simultaneously allocated buffers.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffers currently allocated.
    pub fn allocated(&self) -> usize {
        self.state.lock().unwrap().buffers.len()
    }

    /// Number of allocated buffers that are currently free.
    pub fn free_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .buffers
            .values()
            .filter(|buffer| buffer.state == BufferState::Free)
            .count()
    }

    /// Whether a reservation would fail right now for any size.
    pub fn is_exhausted(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.buffers.len() >= self.capacity
            && !state
                .buffers
                .values()
                .any(|buffer| buffer.state == BufferState::Free)
    }

    /// Get a snapshot of pool usage.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock().unwrap();
        let free = state
            .buffers
            .values()
            .filter(|buffer| buffer.state == BufferState::Free)
            .count();
        PoolStats {
            capacity: self.capacity,
            allocated: state.buffers.len(),
            free,
            reservations: state.counters.reservations,
            reuses: state.counters.reuses,
            allocations: state.counters.allocations,
            evictions: state.counters.evictions,
            exhaustions: state.counters.exhaustions,
        }
    }

    /// Allocate a new reserved buffer under a fresh id. Caller holds the lock
    /// and has ensured `buffers.len() < capacity`.
    fn allocate_locked(&self, state: &mut PoolState, size: usize) -> Result<BufferId> {
        debug_assert!(state.buffers.len() < self.capacity);
        let id = BufferId(state.next_id);
        let name = format!("buf-{}", state.next_id);
        let segment = self.provider.allocate(&name, size)?;
        state.next_id += 1;
        state.buffers.insert(
            id,
            TrackedBuffer {
                segment,
                size,
                state: BufferState::Reserved,
            },
        );
        state.counters.allocations += 1;
        observability::record_allocation(size);
        debug!(buffer = %id, size, "allocated new buffer");
        Ok(id)
    }
}

/// Pick the best free buffer matching `pred` on size: smallest size first,
/// ties broken by lowest (oldest) id. Used both for recycling (smallest
/// sufficient buffer) and for eviction (smallest undersized buffer).
fn best_free(
    buffers: &HashMap<BufferId, TrackedBuffer>,
    pred: impl Fn(usize) -> bool,
) -> Option<BufferId> {
    buffers
        .iter()
        .filter(|(_, buffer)| buffer.state == BufferState::Free && pred(buffer.size))
        .min_by_key(|(id, buffer)| (buffer.size, **id))
        .map(|(id, _)| *id)
}

fn lookup_mut(
    buffers: &mut HashMap<BufferId, TrackedBuffer>,
    id: BufferId,
) -> Result<&mut TrackedBuffer> {
    buffers.get_mut(&id).ok_or(Error::UnknownBuffer(id))
}

impl fmt::Debug for FramePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("FramePool")
            .field("capacity", &stats.capacity)
            .field("allocated", &stats.allocated)
            .field("free", &stats.free)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(capacity: usize) -> Arc<FramePool> {
        FramePool::with_heap_memory(capacity).unwrap()
    }

    #[test]
    fn test_pool_creation() {
        let pool = pool(4);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.allocated(), 0);
        assert_eq!(pool.free_count(), 0);
        assert!(!pool.is_exhausted());
    }

    #[test]
    fn test_zero_capacity_fails() {
        assert!(FramePool::with_heap_memory(0).is_err());
    }

    #[test]
    fn test_reserve_allocates_new() {
        let pool = pool(2);
        let r = pool.reserve_for_producer(1024).unwrap();
        assert_eq!(r.evicted, None);
        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.free_count(), 0);

        let info = pool.buffer_info(r.buffer_id).unwrap();
        assert_eq!(info.size, 1024);
        assert_eq!(info.segment.len(), 1024);
    }

    #[test]
    fn test_relinquish_and_recycle() {
        let pool = pool(2);
        let r = pool.reserve_for_producer(1024).unwrap();
        pool.relinquish_producer_reservation(r.buffer_id).unwrap();
        assert_eq!(pool.free_count(), 1);

        // A smaller request reuses the same 1024-byte segment.
        let r2 = pool.reserve_for_producer(512).unwrap();
        assert_eq!(r2.buffer_id, r.buffer_id);
        assert_eq!(r2.evicted, None);
        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.buffer_info(r2.buffer_id).unwrap().size, 1024);
    }

    #[test]
    fn test_recycle_prefers_smallest_sufficient() {
        let pool = pool(3);
        let small = pool.reserve_for_producer(100).unwrap();
        let big = pool.reserve_for_producer(400).unwrap();
        pool.relinquish_producer_reservation(small.buffer_id).unwrap();
        pool.relinquish_producer_reservation(big.buffer_id).unwrap();

        // Both free buffers satisfy 50 bytes; the 100-byte one wins.
        let r = pool.reserve_for_producer(50).unwrap();
        assert_eq!(r.buffer_id, small.buffer_id);

        // Only the 400-byte buffer satisfies 200 bytes.
        let r2 = pool.reserve_for_producer(200).unwrap();
        assert_eq!(r2.buffer_id, big.buffer_id);
    }

    #[test]
    fn test_hold_round_trip() {
        let pool = pool(1);
        let r = pool.reserve_for_producer(100).unwrap();
        pool.hold_for_consumers(r.buffer_id, 3).unwrap();

        pool.relinquish_consumer_hold(r.buffer_id, 1).unwrap();
        pool.relinquish_consumer_hold(r.buffer_id, 1).unwrap();
        assert_eq!(pool.free_count(), 0);

        pool.relinquish_consumer_hold(r.buffer_id, 1).unwrap();
        assert_eq!(pool.free_count(), 1);

        // Free again: the next reservation recycles it.
        let r2 = pool.reserve_for_producer(100).unwrap();
        assert_eq!(r2.buffer_id, r.buffer_id);
    }

    #[test]
    fn test_hold_release_in_one_call() {
        let pool = pool(1);
        let r = pool.reserve_for_producer(100).unwrap();
        pool.hold_for_consumers(r.buffer_id, 4).unwrap();
        pool.relinquish_consumer_hold(r.buffer_id, 4).unwrap();
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn test_growth_evicts_free_undersized() {
        let pool = pool(1);
        let r1 = pool.reserve_for_producer(100).unwrap();
        pool.relinquish_producer_reservation(r1.buffer_id).unwrap();

        // At capacity, only a free 100-byte buffer: growth evicts it.
        let r2 = pool.reserve_for_producer(200).unwrap();
        assert_ne!(r2.buffer_id, r1.buffer_id);
        assert_eq!(r2.evicted, Some(r1.buffer_id));
        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.buffer_info(r2.buffer_id).unwrap().size, 200);

        // The retired id is permanently invalid.
        assert!(pool.buffer_info(r1.buffer_id).is_none());
        assert!(matches!(
            pool.relinquish_producer_reservation(r1.buffer_id),
            Err(Error::UnknownBuffer(_))
        ));
    }

    #[test]
    fn test_eviction_prefers_smallest() {
        let pool = pool(2);
        let small = pool.reserve_for_producer(100).unwrap();
        let mid = pool.reserve_for_producer(150).unwrap();
        pool.relinquish_producer_reservation(small.buffer_id).unwrap();
        pool.relinquish_producer_reservation(mid.buffer_id).unwrap();

        // Both free buffers are undersized for 200; the 100-byte one is retired.
        let r = pool.reserve_for_producer(200).unwrap();
        assert_eq!(r.evicted, Some(small.buffer_id));
        assert!(pool.buffer_info(mid.buffer_id).is_some());
    }

    #[test]
    fn test_exhaustion_capacity_one() {
        let pool = pool(1);
        let r = pool.reserve_for_producer(100).unwrap();
        pool.hold_for_consumers(r.buffer_id, 1).unwrap();

        assert!(pool.is_exhausted());
        assert!(pool.reserve_for_producer(100).is_none());
        assert_eq!(pool.stats().exhaustions, 1);

        pool.relinquish_consumer_hold(r.buffer_id, 1).unwrap();
        assert!(!pool.is_exhausted());
        assert!(pool.reserve_for_producer(100).is_some());
    }

    #[test]
    fn test_reserved_buffer_never_handed_out_twice() {
        let pool = pool(2);
        let r1 = pool.reserve_for_producer(100).unwrap();
        let r2 = pool.reserve_for_producer(100).unwrap();
        assert_ne!(r1.buffer_id, r2.buffer_id);

        pool.hold_for_consumers(r1.buffer_id, 1).unwrap();
        // Both buffers are referenced; a third reservation fails rather than
        // reusing either id.
        assert!(pool.reserve_for_producer(100).is_none());
    }

    #[test]
    fn test_mixed_sizes_scenario() {
        // capacity = 2: reserve 100 -> hold(2) -> reserve 100 (new) ->
        // reserve 50 fails -> release holds -> 50 recycles the first buffer.
        let pool = pool(2);

        let r0 = pool.reserve_for_producer(100).unwrap();
        pool.hold_for_consumers(r0.buffer_id, 2).unwrap();

        let r1 = pool.reserve_for_producer(100).unwrap();
        assert_ne!(r1.buffer_id, r0.buffer_id);
        assert_eq!(pool.allocated(), 2);

        assert!(pool.reserve_for_producer(50).is_none());

        pool.relinquish_consumer_hold(r0.buffer_id, 2).unwrap();

        // The 100-byte segment satisfies a 50-byte request without reallocation.
        let r2 = pool.reserve_for_producer(50).unwrap();
        assert_eq!(r2.buffer_id, r0.buffer_id);
        assert_eq!(r2.evicted, None);
        assert_eq!(pool.stats().allocations, 2);
    }

    #[test]
    fn test_bound_invariant() {
        let pool = pool(3);
        let mut held = Vec::new();
        for i in 0..20 {
            if let Some(r) = pool.reserve_for_producer(64 * (i + 1)) {
                held.push(r.buffer_id);
            }
            assert!(pool.allocated() <= pool.capacity());
            if held.len() > 1 {
                let id = held.remove(0);
                pool.relinquish_producer_reservation(id).unwrap();
            }
        }
        assert!(pool.allocated() <= pool.capacity());
    }

    #[test]
    fn test_ids_never_reused() {
        let pool = pool(1);
        let mut seen = std::collections::HashSet::new();
        let mut previous: Option<BufferId> = None;
        for size in (1..=10).map(|n| n * 100) {
            let r = pool.reserve_for_producer(size).unwrap();
            assert!(seen.insert(r.buffer_id), "id {} minted twice", r.buffer_id);
            assert_eq!(r.evicted, previous);
            pool.relinquish_producer_reservation(r.buffer_id).unwrap();
            previous = Some(r.buffer_id);
        }
    }

    #[test]
    fn test_unknown_buffer_errors() {
        let pool = pool(1);
        let r = pool.reserve_for_producer(100).unwrap();
        pool.relinquish_producer_reservation(r.buffer_id).unwrap();
        // Evict the buffer so its id is retired.
        let r2 = pool.reserve_for_producer(200).unwrap();
        assert_eq!(r2.evicted, Some(r.buffer_id));

        let stale = r.buffer_id;
        assert!(pool.buffer_info(stale).is_none());
        assert!(matches!(
            pool.share_handle(stale),
            Err(Error::UnknownBuffer(_))
        ));
        assert!(matches!(
            pool.hold_for_consumers(stale, 1),
            Err(Error::UnknownBuffer(_))
        ));
        assert!(matches!(
            pool.relinquish_consumer_hold(stale, 1),
            Err(Error::UnknownBuffer(_))
        ));
    }

    #[test]
    fn test_stats() {
        let pool = pool(2);
        let r = pool.reserve_for_producer(100).unwrap();
        pool.relinquish_producer_reservation(r.buffer_id).unwrap();
        pool.reserve_for_producer(50).unwrap();

        let stats = pool.stats();
        assert_eq!(stats.capacity, 2);
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.free, 0);
        assert_eq!(stats.reservations, 2);
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.reuses, 1);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.exhaustions, 0);
    }

    #[test]
    fn test_heap_pool_share_handle_not_shareable() {
        let pool = pool(1);
        let r = pool.reserve_for_producer(100).unwrap();
        assert!(matches!(
            pool.share_handle(r.buffer_id),
            Err(Error::NotShareable)
        ));
    }

    #[test]
    #[should_panic(expected = "reservation size must be greater than 0")]
    fn test_zero_size_reservation_panics() {
        pool(1).reserve_for_producer(0);
    }

    #[test]
    #[should_panic(expected = "without a producer reservation")]
    fn test_relinquish_unreserved_panics() {
        let pool = pool(1);
        let r = pool.reserve_for_producer(100).unwrap();
        pool.relinquish_producer_reservation(r.buffer_id).unwrap();
        // Second relinquish on a free buffer is a caller bug.
        let _ = pool.relinquish_producer_reservation(r.buffer_id);
    }

    #[test]
    #[should_panic(expected = "without a producer reservation")]
    fn test_hold_unreserved_panics() {
        let pool = pool(1);
        let r = pool.reserve_for_producer(100).unwrap();
        pool.relinquish_producer_reservation(r.buffer_id).unwrap();
        let _ = pool.hold_for_consumers(r.buffer_id, 1);
    }

    #[test]
    #[should_panic(expected = "at least one client")]
    fn test_hold_zero_clients_panics() {
        let pool = pool(1);
        let r = pool.reserve_for_producer(100).unwrap();
        let _ = pool.hold_for_consumers(r.buffer_id, 0);
    }

    #[test]
    #[should_panic(expected = "only 2 outstanding")]
    fn test_over_release_panics() {
        let pool = pool(1);
        let r = pool.reserve_for_producer(100).unwrap();
        pool.hold_for_consumers(r.buffer_id, 2).unwrap();
        let _ = pool.relinquish_consumer_hold(r.buffer_id, 3);
    }

    #[test]
    #[should_panic(expected = "no outstanding consumer holds")]
    fn test_release_unheld_panics() {
        let pool = pool(1);
        let r = pool.reserve_for_producer(100).unwrap();
        let _ = pool.relinquish_consumer_hold(r.buffer_id, 1);
    }
}
