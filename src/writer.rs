//! Boundary contracts between the pool and the table writer it caches.
//!
//! The writer is opaque to the pool. It serialises its own internals, so
//! every method takes `&self` and pooled handles are `Arc<dyn TableWriter>`.
//! The engine injects a [`WriterFactory`] at pool construction; anything a
//! writer needs beyond the table name and root (message bus, engine
//! metrics, schema registry) is captured inside the factory.

use std::path::Path;
use std::sync::Arc;

use crate::error::WriterError;
use crate::fs::TableLock;

/// Task record appended to a busy writer's inbound command queue.
///
/// A publish action fills one in; the writer applies queued records during
/// `tick`, typically structural changes such as ALTER TABLE arriving while
/// an ingest thread holds the writer.
#[derive(Debug, Default, Clone)]
pub struct WriterCommand {
    /// Writer-defined command discriminant.
    pub code: u16,
    /// Serialized command body.
    pub payload: Vec<u8>,
}

/// The table writer as seen by the pool.
pub trait TableWriter: Send + Sync {
    fn table_name(&self) -> &str;

    /// Discards uncommitted work. Called on every return to the pool; a
    /// failure here marks the writer distressed and it will be destroyed
    /// rather than cached.
    fn rollback(&self) -> Result<(), WriterError>;

    /// Housekeeping pass. `contention_free` is true when no other caller
    /// can observe the writer, letting it apply queued structural commands.
    fn tick(&self, contention_free: bool) -> Result<(), WriterError>;

    /// Invokes `write` on a fresh task record under the writer's own
    /// publish protocol. Must be safe to call while another thread holds
    /// the writer.
    fn process_command_async(&self, write: &mut dyn FnMut(&mut WriterCommand));

    /// Hands the writer ownership of the on-disk name lock. Used when a
    /// freshly created table's first writer is installed into the pool.
    fn transfer_lock(&self, lock: TableLock);

    /// Physical teardown: release files, flush state, drop the name lock if
    /// held. Called exactly once, by whoever ends the writer's life.
    fn close(&self);
}

/// Everything the factory needs to open a writer.
#[derive(Debug, Clone, Copy)]
pub struct OpenWriterRequest<'a> {
    pub table: &'a str,
    pub root: &'a Path,
    /// True when the table directory was just created under a name lock and
    /// this is its very first writer.
    pub new_table: bool,
}

/// Opens on-disk writer state for a table.
///
/// May fail with a structured [`WriterError`]; the pool caches that error
/// and re-serves it to the failing thread for a consistent outcome.
pub trait WriterFactory: Send + Sync {
    fn open_writer(&self, request: &OpenWriterRequest<'_>)
        -> Result<Arc<dyn TableWriter>, WriterError>;
}
