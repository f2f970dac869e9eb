//! Metrics collection using metrics-rs.
//!
//! Counter and gauge names are `framepool_`-prefixed constants so exporters
//! see a stable surface regardless of where in the pool they are recorded.

use metrics::Unit;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

// Metric names as constants for consistency
const RESERVATIONS: &str = "framepool_reservations";
const RESERVATION_FAILURES: &str = "framepool_reservation_failures";
const BUFFER_REUSES: &str = "framepool_buffer_reuses";
const BUFFER_ALLOCATIONS: &str = "framepool_buffer_allocations";
const BUFFER_EVICTIONS: &str = "framepool_buffer_evictions";
const ALLOCATED_BUFFERS: &str = "framepool_allocated_buffers";
const ALLOCATED_BYTES: &str = "framepool_allocated_bytes";

/// Initialize metrics descriptions.
///
/// Call this once at application startup before using any metrics.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }

    metrics::describe_counter!(
        RESERVATIONS,
        Unit::Count,
        "Total number of producer reservation attempts"
    );
    metrics::describe_counter!(
        RESERVATION_FAILURES,
        Unit::Count,
        "Reservations that failed because no buffer was free at capacity"
    );
    metrics::describe_counter!(
        BUFFER_REUSES,
        Unit::Count,
        "Reservations satisfied by recycling a free buffer"
    );
    metrics::describe_counter!(
        BUFFER_ALLOCATIONS,
        Unit::Count,
        "New buffer segments allocated"
    );
    metrics::describe_counter!(
        BUFFER_EVICTIONS,
        Unit::Count,
        "Free buffers retired to make room for larger allocations"
    );
    metrics::describe_gauge!(
        ALLOCATED_BUFFERS,
        Unit::Count,
        "Buffers currently allocated in the pool"
    );
    metrics::describe_gauge!(
        ALLOCATED_BYTES,
        Unit::Bytes,
        "Total bytes of segment memory currently allocated"
    );
}

pub(crate) fn record_reservation() {
    metrics::counter!(RESERVATIONS).increment(1);
}

pub(crate) fn record_reservation_failure() {
    metrics::counter!(RESERVATION_FAILURES).increment(1);
}

pub(crate) fn record_reuse() {
    metrics::counter!(BUFFER_REUSES).increment(1);
}

pub(crate) fn record_allocation(size: usize) {
    metrics::counter!(BUFFER_ALLOCATIONS).increment(1);
    metrics::gauge!(ALLOCATED_BUFFERS).increment(1.0);
    metrics::gauge!(ALLOCATED_BYTES).increment(size as f64);
}

pub(crate) fn record_eviction(size: usize) {
    metrics::counter!(BUFFER_EVICTIONS).increment(1);
    metrics::gauge!(ALLOCATED_BUFFERS).decrement(1.0);
    metrics::gauge!(ALLOCATED_BYTES).decrement(size as f64);
}
