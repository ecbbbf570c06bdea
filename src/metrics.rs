use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    documents_loaded: AtomicU64,
    documents_failed: AtomicU64,
    chunks_indexed: AtomicU64,
    chunks_dropped: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stored document with its written and discarded chunk counts.
    pub fn record_document(&self, chunks_indexed: u64, chunks_dropped: u64) {
        self.documents_loaded.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed
            .fetch_add(chunks_indexed, Ordering::Relaxed);
        self.chunks_dropped
            .fetch_add(chunks_dropped, Ordering::Relaxed);
    }

    /// Record a skipped document.
    pub fn record_failure(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_loaded: self.documents_loaded.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents stored since startup.
    pub documents_loaded: u64,
    /// Documents skipped since startup.
    pub documents_failed: u64,
    /// Rows written across all stored documents.
    pub chunks_indexed: u64,
    /// Sub-chunks discarded for exceeding the record ceiling.
    pub chunks_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_chunks() {
        let metrics = IngestMetrics::new();
        metrics.record_document(2, 0);
        metrics.record_document(3, 1);
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_loaded, 2);
        assert_eq!(snapshot.documents_failed, 1);
        assert_eq!(snapshot.chunks_indexed, 5);
        assert_eq!(snapshot.chunks_dropped, 1);
    }

    #[test]
    fn snapshot_starts_at_zero() {
        let snapshot = IngestMetrics::new().snapshot();
        assert_eq!(
            snapshot,
            MetricsSnapshot {
                documents_loaded: 0,
                documents_failed: 0,
                chunks_indexed: 0,
                chunks_dropped: 0,
            }
        );
    }
}
