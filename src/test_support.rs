//! Scripted implementations of the pool's seams for tests and benches.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::MicrosecondClock;
use crate::error::WriterError;
use crate::events::{PoolEvent, PoolListener};
use crate::fs::TableLock;
use crate::writer::{OpenWriterRequest, TableWriter, WriterCommand, WriterFactory};

/// Manually advanced microsecond clock.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn advance(&self, delta: u64) {
        self.now.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::Relaxed);
    }
}

impl MicrosecondClock for ManualClock {
    fn ticks(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

/// Listener that records every event it sees.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<(i64, Option<String>, PoolEvent)>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<(i64, Option<String>, PoolEvent)> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: PoolEvent) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(_, _, seen)| *seen == event)
            .count()
    }
}

impl PoolListener for RecordingListener {
    fn on_event(&self, thread: i64, table: Option<&str>, event: PoolEvent) {
        self.events
            .lock()
            .push((thread, table.map(str::to_string), event));
    }
}

/// Deliberately unsynchronised counter.
///
/// Exists to exercise the pool's ownership handoff: it is only sound to
/// touch while holding the writer from the pool, whose release store /
/// acquire CAS pair orders the accesses.
#[derive(Debug, Default)]
pub struct RacyCounter(UnsafeCell<u64>);

// Safety: synchronisation is delegated to the pool's owner protocol; see
// the type docs.
unsafe impl Sync for RacyCounter {}

impl RacyCounter {
    pub fn bump(&self) -> u64 {
        unsafe {
            let value = &mut *self.0.get();
            *value += 1;
            *value
        }
    }

    pub fn get(&self) -> u64 {
        unsafe { *self.0.get() }
    }
}

static NEXT_WRITER_ID: AtomicU64 = AtomicU64::new(1);

/// Scripted table writer backing the pool tests.
pub struct MockWriter {
    id: u64,
    table: String,
    queued: Mutex<Vec<WriterCommand>>,
    applied: Mutex<Vec<WriterCommand>>,
    lock: Mutex<Option<TableLock>>,
    fail_rollback: AtomicBool,
    closed: AtomicBool,
    rollbacks: AtomicU64,
    /// Shared, unsynchronised scratch cell for visibility tests.
    pub counter: RacyCounter,
}

impl MockWriter {
    fn new(table: &str) -> Self {
        Self {
            id: NEXT_WRITER_ID.fetch_add(1, Ordering::Relaxed),
            table: table.to_string(),
            queued: Mutex::new(Vec::new()),
            applied: Mutex::new(Vec::new()),
            lock: Mutex::new(None),
            fail_rollback: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            rollbacks: AtomicU64::new(0),
            counter: RacyCounter::default(),
        }
    }

    /// Unique id, for telling writer instances apart across re-creation.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn holds_lock(&self) -> bool {
        self.lock.lock().is_some()
    }

    pub fn rollback_count(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }

    /// Arms a one-shot rollback failure, marking the writer distressed on
    /// its next return to the pool.
    pub fn fail_next_rollback(&self) {
        self.fail_rollback.store(true, Ordering::Release);
    }

    /// Commands applied so far by `tick`.
    pub fn applied_commands(&self) -> Vec<WriterCommand> {
        self.applied.lock().clone()
    }

    /// Commands queued but not yet applied.
    pub fn queued_commands(&self) -> Vec<WriterCommand> {
        self.queued.lock().clone()
    }
}

impl TableWriter for MockWriter {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn rollback(&self) -> Result<(), WriterError> {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
        if self.fail_rollback.swap(false, Ordering::AcqRel) {
            return Err(WriterError::with_errno("could not roll back, disk full", 28));
        }
        Ok(())
    }

    fn tick(&self, contention_free: bool) -> Result<(), WriterError> {
        if contention_free {
            let mut queued = self.queued.lock();
            self.applied.lock().append(&mut queued);
        }
        Ok(())
    }

    fn process_command_async(&self, write: &mut dyn FnMut(&mut WriterCommand)) {
        let mut command = WriterCommand::default();
        write(&mut command);
        self.queued.lock().push(command);
    }

    fn transfer_lock(&self, lock: TableLock) {
        *self.lock.lock() = Some(lock);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.lock.lock().take();
    }
}

/// Factory producing [`MockWriter`]s, with scripted failure injection.
#[derive(Default)]
pub struct MockWriterFactory {
    created: AtomicU64,
    fail_next: Mutex<Option<WriterError>>,
    writers: Mutex<Vec<Arc<MockWriter>>>,
}

impl MockWriterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a one-shot construction failure.
    pub fn fail_next_open(&self, err: WriterError) {
        *self.fail_next.lock() = Some(err);
    }

    /// Number of writers successfully constructed.
    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Most recently constructed writer, if any.
    pub fn last_writer(&self) -> Option<Arc<MockWriter>> {
        self.writers.lock().last().cloned()
    }

    /// Every writer constructed so far, in creation order.
    pub fn writers(&self) -> Vec<Arc<MockWriter>> {
        self.writers.lock().clone()
    }

    /// Most recent writer constructed for `table`.
    pub fn writer_for(&self, table: &str) -> Option<Arc<MockWriter>> {
        self.writers
            .lock()
            .iter()
            .rev()
            .find(|writer| writer.table == table)
            .cloned()
    }
}

impl WriterFactory for MockWriterFactory {
    fn open_writer(
        &self,
        request: &OpenWriterRequest<'_>,
    ) -> Result<Arc<dyn TableWriter>, WriterError> {
        if let Some(err) = self.fail_next.lock().take() {
            return Err(err);
        }
        let writer = Arc::new(MockWriter::new(request.table));
        self.created.fetch_add(1, Ordering::Relaxed);
        self.writers.lock().push(Arc::clone(&writer));
        Ok(writer)
    }
}
