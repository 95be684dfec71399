//! Process-wide cache of single-writer table handles for a columnar
//! time-series engine.
//!
//! Table writers are expensive to open and must be unique per table name.
//! This crate keeps open writers cached between uses while enforcing that
//! at most one caller holds a given table's writer at any moment, extends
//! the exclusion across processes with an on-disk advisory lock file, and
//! reclaims writers that sit idle past a TTL.
//!
//! ## Architecture Overview
//!
//! - **Entry map**: a concurrent map from table name to per-table state
//! - **Ownership protocol**: a lock-free CAS ladder over an atomic owner
//!   word, with release/acquire ordering so a new holder sees everything
//!   the previous holder wrote
//! - **Lifecycle hook**: handles returned by the pool are drop guards whose
//!   close path routes the writer back into the cache instead of tearing it
//!   down
//! - **Eviction**: a deadline-driven reclamation pass, optionally driven by
//!   a background janitor thread
//! - **Name locks**: non-blocking administrative locks backed by advisory
//!   file locks, used around create/rename/drop
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use writer_pool::{PoolConfig, WriterPool};
//! # fn factory() -> Arc<dyn writer_pool::WriterFactory> { unimplemented!() }
//!
//! let pool = WriterPool::new(PoolConfig::new("/var/lib/db"), factory());
//! let writer = pool.get("trades", "ingest")?;
//! // ... append rows ...
//! writer.close(); // returns the writer to the cache
//! # Ok::<(), writer_pool::PoolError>(())
//! ```
//!
//! ## Thread Safety
//!
//! All public APIs are thread-safe. No pool operation blocks beyond bounded
//! CPU-pause spins and the file-system calls it wraps; contended acquires
//! fail fast with a retryable error carrying the holder's reason.

pub mod config;
pub mod error;
pub mod events;
pub mod fs;
pub mod janitor;
pub mod metrics;
pub mod test_support;
pub mod writer;

mod pool;

pub use config::{MicrosecondClock, OsMicrosecondClock, PoolConfig};
pub use error::{PoolError, PoolResult, WriterError};
pub use events::{CloseReason, NoopListener, PoolEvent, PoolListener};
pub use fs::{lock_path, TableLock, LOCK_FILE_EXTENSION};
pub use janitor::PoolJanitor;
pub use metrics::{PoolMetrics, PoolMetricsSnapshot};
pub use pool::{
    PooledWriter, WriterPool, OWNERSHIP_REASON_RELEASED, OWNERSHIP_REASON_UNKNOWN, UNALLOCATED,
};
pub use writer::{OpenWriterRequest, TableWriter, WriterCommand, WriterFactory};
