//! Server statistics.
//!
//! Counters are serialized by one mutex; the hot path takes it once per
//! bump, and readers get a value copy. Hits and misses are tracked
//! separately so the hit rate is an actual ratio rather than an
//! approximation derived from op counts.

use std::sync::Mutex;

/// A value copy of the counters at one point in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_ops: u64,
    pub get_ops: u64,
    pub set_ops: u64,
    pub del_ops: u64,
    pub hits: u64,
    pub misses: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub connections: u64,
}

impl StatsSnapshot {
    /// Fraction of GETs that found a live value. 0.0 before any GET.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }
}

/// Shared counter set, cheap to clone behind an `Arc`.
#[derive(Debug, Default)]
pub struct ServerStats {
    inner: Mutex<StatsSnapshot>,
}

impl ServerStats {
    pub fn new() -> ServerStats {
        ServerStats::default()
    }

    fn bump(&self, f: impl FnOnce(&mut StatsSnapshot)) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut inner);
    }

    /// Total executed operations. Pipelines count their inner commands, not
    /// the wrapper.
    pub fn add_total_ops(&self, n: u64) {
        self.bump(|s| s.total_ops += n);
    }

    pub fn record_get(&self) {
        self.bump(|s| s.get_ops += 1);
    }

    pub fn record_set(&self) {
        self.bump(|s| s.set_ops += 1);
    }

    pub fn record_del(&self) {
        self.bump(|s| s.del_ops += 1);
    }

    pub fn record_hit(&self) {
        self.bump(|s| s.hits += 1);
    }

    pub fn record_miss(&self) {
        self.bump(|s| s.misses += 1);
    }

    pub fn record_connection(&self) {
        self.bump(|s| s.connections += 1);
    }

    pub fn add_bytes_read(&self, n: u64) {
        self.bump(|s| s.bytes_read += n);
    }

    pub fn add_bytes_written(&self, n: u64) {
        self.bump(|s| s.bytes_written += n);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        *self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = ServerStats::new();
        stats.add_total_ops(3);
        stats.record_get();
        stats.record_set();
        stats.record_del();
        stats.add_bytes_read(10);
        stats.add_bytes_written(20);
        stats.record_connection();

        let snap = stats.snapshot();
        assert_eq!(snap.total_ops, 3);
        assert_eq!(snap.get_ops, 1);
        assert_eq!(snap.set_ops, 1);
        assert_eq!(snap.del_ops, 1);
        assert_eq!(snap.bytes_read, 10);
        assert_eq!(snap.bytes_written, 20);
        assert_eq!(snap.connections, 1);
    }

    #[test]
    fn hit_rate_is_hits_over_lookups() {
        let stats = ServerStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert!((stats.snapshot().hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn hit_rate_with_no_lookups() {
        assert_eq!(ServerStats::new().snapshot().hit_rate(), 0.0);
    }

    #[test]
    fn snapshot_is_a_value_copy() {
        let stats = ServerStats::new();
        let before = stats.snapshot();
        stats.record_get();
        assert_eq!(before.get_ops, 0);
        assert_eq!(stats.snapshot().get_ops, 1);
    }
}
