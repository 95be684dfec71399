use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the pool counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct PoolMetricsSnapshot {
    pub writers_created: u64,
    pub writers_reused: u64,
    pub creation_failures: u64,
    pub writers_expired: u64,
    pub commands_published: u64,
    pub busy_conflicts: u64,
    pub locks_acquired: u64,
    pub lock_conflicts: u64,
}

/// Internal pool counters, lock-free and monotonic.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    writers_created: AtomicU64,
    writers_reused: AtomicU64,
    creation_failures: AtomicU64,
    writers_expired: AtomicU64,
    commands_published: AtomicU64,
    busy_conflicts: AtomicU64,
    locks_acquired: AtomicU64,
    lock_conflicts: AtomicU64,
}

impl PoolMetrics {
    pub fn snapshot(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            writers_created: self.writers_created.load(Ordering::Relaxed),
            writers_reused: self.writers_reused.load(Ordering::Relaxed),
            creation_failures: self.creation_failures.load(Ordering::Relaxed),
            writers_expired: self.writers_expired.load(Ordering::Relaxed),
            commands_published: self.commands_published.load(Ordering::Relaxed),
            busy_conflicts: self.busy_conflicts.load(Ordering::Relaxed),
            locks_acquired: self.locks_acquired.load(Ordering::Relaxed),
            lock_conflicts: self.lock_conflicts.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn incr_created(&self) {
        self.writers_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_reused(&self) {
        self.writers_reused.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_creation_failures(&self) {
        self.creation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_expired(&self) {
        self.writers_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_commands_published(&self) {
        self.commands_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_busy_conflicts(&self) {
        self.busy_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_locks_acquired(&self) {
        self.locks_acquired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_lock_conflicts(&self) {
        self.lock_conflicts.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let metrics = PoolMetrics::default();
        metrics.incr_created();
        metrics.incr_created();
        metrics.incr_busy_conflicts();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.writers_created, 2);
        assert_eq!(snapshot.busy_conflicts, 1);
        assert_eq!(snapshot.writers_expired, 0);
    }
}
