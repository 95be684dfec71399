use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Default age past which an idle cached writer becomes evictable (10 minutes).
const DEFAULT_INACTIVE_WRITER_TTL_US: u64 = 600 * 1_000_000;

/// Configuration for a [`WriterPool`](crate::pool::WriterPool).
///
/// A pool instance covers a single storage root: table directories and their
/// lock files live directly under `root`, and table names are unique in the
/// context of that root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Filesystem root for table directories and lock files.
    pub root: PathBuf,
    /// Microsecond age past which an idle entry is evictable.
    pub inactive_writer_ttl_us: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            inactive_writer_ttl_us: DEFAULT_INACTIVE_WRITER_TTL_US,
        }
    }
}

impl PoolConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_inactive_writer_ttl_us(mut self, ttl_us: u64) -> Self {
        self.inactive_writer_ttl_us = ttl_us;
        self
    }

    #[cfg(test)]
    pub fn for_tests(root: impl Into<PathBuf>) -> Self {
        Self::new(root).with_inactive_writer_ttl_us(1_000)
    }
}

/// Monotonic-enough microsecond time source consumed by the pool.
///
/// The pool only compares ticks against each other, so the epoch is
/// irrelevant; tests substitute a manually advanced clock.
pub trait MicrosecondClock: Send + Sync {
    fn ticks(&self) -> u64;
}

/// Wall-clock microseconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsMicrosecondClock;

impl MicrosecondClock for OsMicrosecondClock {
    fn ticks(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_ten_minutes() {
        let config = PoolConfig::default();
        assert_eq!(config.inactive_writer_ttl_us, 600 * 1_000_000);
    }

    #[test]
    fn builder_overrides_ttl() {
        let config = PoolConfig::new("/tmp/db").with_inactive_writer_ttl_us(42);
        assert_eq!(config.inactive_writer_ttl_us, 42);
        assert_eq!(config.root, PathBuf::from("/tmp/db"));
    }

    #[test]
    fn os_clock_advances() {
        let clock = OsMicrosecondClock;
        let a = clock.ticks();
        let b = clock.ticks();
        assert!(b >= a);
    }
}
