//! Plain in-process counters the supervisor (C7) polls for a health signal.
//! No external exporter is wired up — that stays out of scope per `spec.md`
//! §1 — but the counters exist so a health signal has something to report.
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    batches_sealed: AtomicU64,
    batches_dropped: AtomicU64,
    findings_detected: AtomicU64,
    findings_deduped: AtomicU64,
    findings_rejected: AtomicU64,
    findings_published: AtomicU64,
    publish_failures: AtomicU64,
    cache_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub batches_sealed: u64,
    pub batches_dropped: u64,
    pub findings_detected: u64,
    pub findings_deduped: u64,
    pub findings_rejected: u64,
    pub findings_published: u64,
    pub publish_failures: u64,
    pub cache_failures: u64,
}

impl Metrics {
    pub fn record_batch_sealed(&self) {
        self.batches_sealed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_dropped(&self) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_finding_detected(&self) {
        self.findings_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_finding_deduped(&self) {
        self.findings_deduped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_finding_rejected(&self) {
        self.findings_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_finding_published(&self) {
        self.findings_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_failure(&self) {
        self.cache_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            batches_sealed: self.batches_sealed.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            findings_detected: self.findings_detected.load(Ordering::Relaxed),
            findings_deduped: self.findings_deduped.load(Ordering::Relaxed),
            findings_rejected: self.findings_rejected.load(Ordering::Relaxed),
            findings_published: self.findings_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            cache_failures: self.cache_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_independently() {
        let metrics = Metrics::default();
        metrics.record_batch_sealed();
        metrics.record_batch_dropped();
        metrics.record_batch_dropped();
        metrics.record_finding_published();

        let snap = metrics.snapshot();
        assert_eq!(snap.batches_sealed, 1);
        assert_eq!(snap.batches_dropped, 2);
        assert_eq!(snap.findings_published, 1);
        assert_eq!(snap.publish_failures, 0);
    }
}
