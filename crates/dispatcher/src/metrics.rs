use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct DispatcherMetrics {
    polls: AtomicU64,
    executed: AtomicU64,
    failed: AtomicU64,
    transport_errors: AtomicU64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatcherMetricsSnapshot {
    pub polls: u64,
    pub executed: u64,
    pub failed: u64,
    pub transport_errors: u64,
}

fn increment(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl DispatcherMetrics {
    pub fn record_poll(&self) {
        increment(&self.polls);
    }

    pub fn record_executed(&self, success: bool) {
        increment(&self.executed);
        if !success {
            increment(&self.failed);
        }
    }

    pub fn record_transport_error(&self) {
        increment(&self.transport_errors);
    }

    pub fn snapshot(&self) -> DispatcherMetricsSnapshot {
        DispatcherMetricsSnapshot {
            polls: self.polls.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}
