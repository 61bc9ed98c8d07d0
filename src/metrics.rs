//! Operation counters. No allocations, no locks, just atomics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Queue metrics. All counters are monotonic.
#[derive(Debug)]
pub struct QueueMetrics {
    pub puts: AtomicU64,
    pub pops: AtomicU64,
    pub evictions: AtomicU64,
    pub fsyncs: AtomicU64,
    pub bytes_written: AtomicU64,
    pub total_put_latency_ns: AtomicU64,
    pub max_put_latency_ns: AtomicU64,
}

impl QueueMetrics {
    pub const fn new() -> Self {
        Self {
            puts: AtomicU64::new(0),
            pops: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            fsyncs: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            total_put_latency_ns: AtomicU64::new(0),
            max_put_latency_ns: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    pub fn record_put(&self, bytes: u64, latency_ns: u64) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
        self.total_put_latency_ns.fetch_add(latency_ns, Ordering::Relaxed);
        self.max_put_latency_ns.fetch_max(latency_ns, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_pop(&self) {
        self.pops.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_fsync(&self) {
        self.fsyncs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn puts(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    pub fn pops(&self) -> u64 {
        self.pops.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn fsyncs(&self) -> u64 {
        self.fsyncs.load(Ordering::Relaxed)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    pub fn avg_put_latency_ns(&self) -> u64 {
        let puts = self.puts();
        if puts == 0 {
            0
        } else {
            self.total_put_latency_ns.load(Ordering::Relaxed) / puts
        }
    }

    pub fn max_put_latency_ns(&self) -> u64 {
        self.max_put_latency_ns.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            puts: self.puts(),
            pops: self.pops(),
            evictions: self.evictions(),
            fsyncs: self.fsyncs(),
            bytes_written: self.bytes_written(),
            avg_put_latency_ns: self.avg_put_latency_ns(),
            max_put_latency_ns: self.max_put_latency_ns(),
        }
    }
}

impl Default for QueueMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot for export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub puts: u64,
    pub pops: u64,
    pub evictions: u64,
    pub fsyncs: u64,
    pub bytes_written: u64,
    pub avg_put_latency_ns: u64,
    pub max_put_latency_ns: u64,
}
