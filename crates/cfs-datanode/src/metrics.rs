use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

const ORDER: Ordering = Ordering::SeqCst;

/// latency samples accumulated between two recomputes.
/// Locked as a whole so a drain never splits a sample across windows.
#[derive(Default, Debug)]
struct LatencyWindow(Mutex<WindowSamples>);

#[derive(Default, Debug)]
struct WindowSamples {
    count: u64,
    total: u64,
    max: u64,
}

impl LatencyWindow {
    fn add(&self, latency: u64) {
        let mut samples = self.0.lock();
        samples.count += 1;
        samples.total = samples.total.saturating_add(latency);
        samples.max = samples.max.max(latency);
    }

    /// drain window, returns (count, average, max)
    fn drain(&self) -> (u64, u64, u64) {
        let WindowSamples { count, total, max } = std::mem::take(&mut *self.0.lock());
        let avg = if count == 0 { 0 } else { total / count };
        (count, avg, max)
    }
}

#[derive(Default, Debug, Serialize)]
struct LatencyStats {
    ops: AtomicU64,
    avg_latency: AtomicU64,
    max_latency: AtomicU64,
}

impl LatencyStats {
    fn store(&self, (ops, avg, max): (u64, u64, u64)) {
        self.ops.store(ops, ORDER);
        self.avg_latency.store(avg, ORDER);
        self.max_latency.store(max, ORDER);
    }
}

/// Read and write latency of one partition.
/// Samples are folded into rolling stats by the metrics scheduler.
#[derive(Default, Debug, Serialize)]
pub struct PartitionMetrics {
    #[serde(skip)]
    pending_write: LatencyWindow,
    #[serde(skip)]
    pending_read: LatencyWindow,
    write: LatencyStats,
    read: LatencyStats,
}

impl PartitionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_write_metrics(&self, latency: u64) {
        self.pending_write.add(latency);
    }

    pub fn add_read_metrics(&self, latency: u64) {
        self.pending_read.add(latency);
    }

    /// replace stats with the samples collected since last call
    pub fn recompute_latency(&self) {
        self.write.store(self.pending_write.drain());
        self.read.store(self.pending_read.drain());
    }

    pub fn write_ops(&self) -> u64 {
        self.write.ops.load(ORDER)
    }

    pub fn avg_write_latency(&self) -> u64 {
        self.write.avg_latency.load(ORDER)
    }

    pub fn max_write_latency(&self) -> u64 {
        self.write.max_latency.load(ORDER)
    }

    pub fn read_ops(&self) -> u64 {
        self.read.ops.load(ORDER)
    }

    pub fn avg_read_latency(&self) -> u64 {
        self.read.avg_latency.load(ORDER)
    }

    pub fn max_read_latency(&self) -> u64 {
        self.read.max_latency.load(ORDER)
    }
}
