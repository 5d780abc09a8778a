use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Collects runtime statistics about index operations using lock-free atomic counters.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    query_count: AtomicU64,
    add_count: AtomicU64,
    delete_count: AtomicU64,
    total_candidates_examined: AtomicU64,
    candidates_skipped: AtomicU64,
    total_query_time_ns: AtomicU64,
    bucket_hits: AtomicU64,
    bucket_misses: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_query(&self, candidates: u64, duration_ns: u64) {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.total_candidates_examined
            .fetch_add(candidates, Ordering::Relaxed);
        self.total_query_time_ns
            .fetch_add(duration_ns, Ordering::Relaxed);
    }

    pub fn record_adds(&self, n: u64) {
        self.add_count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.delete_count.fetch_add(1, Ordering::Relaxed);
    }

    /// A candidate dropped because its distance could not be computed.
    pub fn record_skipped(&self, n: u64) {
        self.candidates_skipped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_buckets(&self, hits: u64, misses: u64) {
        self.bucket_hits.fetch_add(hits, Ordering::Relaxed);
        self.bucket_misses.fetch_add(misses, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let query_count = self.query_count.load(Ordering::Relaxed);
        let total_query_time_ns = self.total_query_time_ns.load(Ordering::Relaxed);
        let total_candidates = self.total_candidates_examined.load(Ordering::Relaxed);
        let hits = self.bucket_hits.load(Ordering::Relaxed);
        let misses = self.bucket_misses.load(Ordering::Relaxed);

        MetricsSnapshot {
            query_count,
            add_count: self.add_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
            candidates_skipped: self.candidates_skipped.load(Ordering::Relaxed),
            avg_query_time_us: if query_count > 0 {
                total_query_time_ns as f64 / query_count as f64 / 1000.0
            } else {
                0.0
            },
            avg_candidates_per_query: if query_count > 0 {
                total_candidates as f64 / query_count as f64
            } else {
                0.0
            },
            hit_rate: if hits + misses > 0 {
                hits as f64 / (hits + misses) as f64
            } else {
                0.0
            },
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.query_count,
            &self.add_count,
            &self.delete_count,
            &self.total_candidates_examined,
            &self.candidates_skipped,
            &self.total_query_time_ns,
            &self.bucket_hits,
            &self.bucket_misses,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A point-in-time snapshot of index metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub query_count: u64,
    pub add_count: u64,
    pub delete_count: u64,
    /// Candidates whose custom distance failed and were left out of results.
    pub candidates_skipped: u64,
    pub avg_query_time_us: f64,
    pub avg_candidates_per_query: f64,
    /// Fraction of table lookups that landed on a non-empty bucket.
    pub hit_rate: f64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Queries: {}, Adds: {}, Deletes: {}, Avg query: {:.2}us, \
             Avg candidates: {:.1}, Skipped: {}, Hit rate: {:.1}%",
            self.query_count,
            self.add_count,
            self.delete_count,
            self.avg_query_time_us,
            self.avg_candidates_per_query,
            self.candidates_skipped,
            self.hit_rate * 100.0,
        )
    }
}

/// Measures one query's wall time.
pub(crate) struct QueryTimer {
    start: Instant,
}

impl QueryTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ns(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_averages() {
        let m = MetricsCollector::new();
        m.record_query(10, 2_000);
        m.record_query(20, 4_000);
        m.record_buckets(3, 1);
        m.record_adds(5);
        m.record_delete();

        let s = m.snapshot();
        assert_eq!(s.query_count, 2);
        assert_eq!(s.add_count, 5);
        assert_eq!(s.delete_count, 1);
        assert!((s.avg_candidates_per_query - 15.0).abs() < 1e-9);
        assert!((s.avg_query_time_us - 3.0).abs() < 1e-9);
        assert!((s.hit_rate - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let m = MetricsCollector::new();
        m.record_query(1, 1);
        m.record_skipped(2);
        m.reset();
        let s = m.snapshot();
        assert_eq!(s.query_count, 0);
        assert_eq!(s.candidates_skipped, 0);
        assert_eq!(s.hit_rate, 0.0);
    }
}
