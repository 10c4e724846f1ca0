//! Resolver statistics. Grounded on the shape of
//! `tinymist-analysis/src/stats.rs`'s `QueryStatBucket` (atomic counters
//! behind a cheap `Default`), scaled down to the counters this resolver
//! actually needs: that bucket's per-query wall-clock buckets track many
//! distinct query kinds across a whole language server, where this crate has
//! one resolution loop and an existing per-node debug trail (`Provenance`),
//! so only the counts worth reporting in aggregate are kept.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters incremented by the resolver's memoized, cycle-guarded lookup
/// (`resolver::Resolution::resolve`).
#[derive(Default)]
pub struct Stats {
    pub memo_hits: AtomicU64,
    pub memo_misses: AtomicU64,
    pub cycles_detected: AtomicU64,
    pub depth_limit_hits: AtomicU64,
}

impl Stats {
    pub fn record_memo_hit(&self) {
        self.memo_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_memo_miss(&self) {
        self.memo_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle(&self) {
        self.cycles_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_depth_limit(&self) {
        self.depth_limit_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            memo_hits: self.memo_hits.load(Ordering::Relaxed),
            memo_misses: self.memo_misses.load(Ordering::Relaxed),
            cycles_detected: self.cycles_detected.load(Ordering::Relaxed),
            depth_limit_hits: self.depth_limit_hits.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub memo_hits: u64,
    pub memo_misses: u64,
    pub cycles_detected: u64,
    pub depth_limit_hits: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_increment() {
        let stats = Stats::default();
        stats.record_memo_hit();
        stats.record_memo_hit();
        stats.record_cycle();
        let snap = stats.snapshot();
        assert_eq!(snap.memo_hits, 2);
        assert_eq!(snap.memo_misses, 0);
        assert_eq!(snap.cycles_detected, 1);
    }
}
