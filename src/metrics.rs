//! Prometheus metrics for the row store
//!
//! Features:
//! - Pool metrics (bytes allocated, extended, freed)
//! - Paged storage metrics (sealed pages, compressed bytes)
//! - Grouping metrics (groups created, rows merged)
//!
//! The counters are process-wide and observational. Per-pool numbers come
//! from [`crate::memory::Pool::stats`].

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use std::sync::Once;
use tracing::{error, info};

lazy_static::lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    // Pool metrics
    pub static ref POOL_ALLOCATED_BYTES: IntCounter = IntCounter::new(
        "photonflat_pool_allocated_bytes_total",
        "Total bytes handed out by pool allocations"
    ).unwrap();

    pub static ref POOL_EXTENDED_BYTES: IntCounter = IntCounter::new(
        "photonflat_pool_extended_bytes_total",
        "Total bytes added by pool extensions"
    ).unwrap();

    pub static ref POOL_FREED_BYTES: IntCounter = IntCounter::new(
        "photonflat_pool_freed_bytes_total",
        "Total bytes returned to pools"
    ).unwrap();

    // Paged storage metrics
    pub static ref PAGES_SEALED: IntCounter = IntCounter::new(
        "photonflat_pages_sealed_total",
        "Total pages sealed into compression blocks"
    ).unwrap();

    pub static ref PAGES_COMPRESSED_BYTES: IntCounter = IntCounter::new(
        "photonflat_pages_compressed_bytes_total",
        "Total payload bytes of sealed pages after compression"
    ).unwrap();

    // Grouping metrics
    pub static ref GROUPS_CREATED: IntCounter = IntCounter::new(
        "photonflat_groups_created_total",
        "Total groups created by hash aggregation"
    ).unwrap();

    pub static ref ROWS_MERGED: IntCounter = IntCounter::new(
        "photonflat_rows_merged_total",
        "Total input rows merged into an existing group"
    ).unwrap();
}

static INIT: Once = Once::new();

/// Initialize metrics registry
///
/// Safe to call repeatedly; registration happens once per process.
pub fn init_metrics() {
    INIT.call_once(|| {
        info!("Initializing Prometheus metrics");

        METRICS_REGISTRY.register(Box::new(POOL_ALLOCATED_BYTES.clone())).ok();
        METRICS_REGISTRY.register(Box::new(POOL_EXTENDED_BYTES.clone())).ok();
        METRICS_REGISTRY.register(Box::new(POOL_FREED_BYTES.clone())).ok();
        METRICS_REGISTRY.register(Box::new(PAGES_SEALED.clone())).ok();
        METRICS_REGISTRY.register(Box::new(PAGES_COMPRESSED_BYTES.clone())).ok();
        METRICS_REGISTRY.register(Box::new(GROUPS_CREATED.clone())).ok();
        METRICS_REGISTRY.register(Box::new(ROWS_MERGED.clone())).ok();
    });
}

/// Export all metrics in Prometheus text format
pub fn export_metrics() -> String {
    init_metrics();

    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|_| String::from("# Error converting metrics\n"))
}
