//! Process-wide cache of table writer handles.
//!
//! The pool enforces the engine's single-writer-per-table rule: at most one
//! writer instance exists for a given table name within the process, and at
//! most one caller holds it at a time. Ownership is coordinated with a CAS
//! ladder over an atomic owner word per entry; the on-disk lock file extends
//! the exclusion across processes.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::config::{MicrosecondClock, OsMicrosecondClock, PoolConfig};
use crate::error::{PoolError, PoolResult, WriterError};
use crate::events::{CloseReason, NoopListener, PoolEvent, PoolListener};
use crate::fs;
use crate::metrics::{PoolMetrics, PoolMetricsSnapshot};
use crate::writer::{OpenWriterRequest, TableWriter, WriterCommand, WriterFactory};

/// Owner-word value meaning "idle, first CAS wins".
pub const UNALLOCATED: i64 = -1;

/// Reason substituted when a busy entry's reason has not caught up yet.
pub const OWNERSHIP_REASON_UNKNOWN: &str = "unknown";
/// Reason stamped after a cached writer was physically closed.
pub const OWNERSHIP_REASON_RELEASED: &str = "released";
const OWNERSHIP_REASON_MISSING: &str = "missing or owned by other process";
const OWNERSHIP_REASON_WRITER_ERROR: &str = "writer error";
const OWNERSHIP_REASON_PLEASE_RETRY: &str = "please retry";

static NEXT_THREAD_ID: AtomicI64 = AtomicI64::new(0);

thread_local! {
    static THREAD_ID: i64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Pool-local identity of the calling thread. Ids are non-negative, so the
/// owner word's three encodings (id, `UNALLOCATED`, eviction sentinel) stay
/// disjoint.
pub(crate) fn current_thread_id() -> i64 {
    THREAD_ID.with(|id| *id)
}

/// Owner-word value parked by the eviction job while it tears an entry down.
#[inline]
fn eviction_sentinel(thread: i64) -> i64 {
    -thread - 2
}

fn reinterpret_reason(reason: Option<String>) -> String {
    // Winning the owner CAS and recording the reason are not atomic; a
    // second caller can observe a busy entry whose reason is still empty.
    reason.unwrap_or_else(|| OWNERSHIP_REASON_UNKNOWN.to_string())
}

/// Per-table state record.
pub(crate) struct PoolEntry {
    /// Thread id of the current holder, `UNALLOCATED`, or a negative
    /// eviction sentinel.
    owner: AtomicI64,
    /// Cached writer; empty while name-locked or between create attempts.
    /// Mutated only by the recorded owner (or the eviction sentinel holder).
    writer: Mutex<Option<Arc<dyn TableWriter>>>,
    /// Diagnostic recorded by the holder, surfaced to refused callers.
    ownership_reason: Mutex<Option<String>>,
    /// Microsecond stamp of the last successful return to the pool.
    last_release_time: AtomicU64,
    /// Error of the last failed create attempt, re-served to the thread
    /// that caused it.
    ex: Mutex<Option<WriterError>>,
    /// Open lock file while the entry is administratively locked.
    lock: Mutex<Option<fs::TableLock>>,
}

impl PoolEntry {
    fn new(owner: i64, now: u64) -> Self {
        Self {
            owner: AtomicI64::new(owner),
            writer: Mutex::new(None),
            ownership_reason: Mutex::new(None),
            last_release_time: AtomicU64::new(now),
            ex: Mutex::new(None),
            lock: Mutex::new(None),
        }
    }
}

enum Acquired {
    Writer(PooledWriter),
    Published,
}

/// Exclusive handle to a pooled table writer.
///
/// Derefs to the writer. Dropping the handle (or calling [`close`]) is the
/// writer's lifecycle hook: a pooled handle returns the writer to the cache
/// after rollback, while a detached handle (pool closed during acquire)
/// physically closes it.
///
/// [`close`]: PooledWriter::close
pub struct PooledWriter {
    pool: Arc<PoolInner>,
    entry: Arc<PoolEntry>,
    writer: Arc<dyn TableWriter>,
    detached: bool,
}

impl PooledWriter {
    /// Returns the writer to the pool (or tears it down when detached).
    /// Equivalent to dropping the handle; provided for call-site clarity.
    pub fn close(self) {}

    pub fn writer(&self) -> &Arc<dyn TableWriter> {
        &self.writer
    }

    /// True when the pool closed during acquisition and this writer is no
    /// longer cached anywhere.
    pub fn is_detached(&self) -> bool {
        self.detached
    }
}

impl Deref for PooledWriter {
    type Target = dyn TableWriter;

    fn deref(&self) -> &Self::Target {
        self.writer.as_ref()
    }
}

impl fmt::Debug for PooledWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledWriter")
            .field("table", &self.writer.table_name())
            .field("detached", &self.detached)
            .finish()
    }
}

impl Drop for PooledWriter {
    fn drop(&mut self) {
        if self.detached {
            info!(table = %self.writer.table_name(), "closing writer released from pool");
            self.writer.close();
        } else {
            self.pool.return_to_pool(&self.entry, &self.writer);
        }
    }
}

pub(crate) struct PoolInner {
    config: PoolConfig,
    entries: DashMap<String, Arc<PoolEntry>>,
    factory: Arc<dyn WriterFactory>,
    clock: Arc<dyn MicrosecondClock>,
    listener: Arc<dyn PoolListener>,
    metrics: PoolMetrics,
    closed: AtomicBool,
}

impl PoolInner {
    fn notify(&self, thread: i64, table: Option<&str>, event: PoolEvent) {
        self.listener.on_event(thread, table, event);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> PoolResult<()> {
        if self.is_closed() {
            info!("is closed");
            return Err(PoolError::PoolClosed);
        }
        Ok(())
    }

    fn find_or_insert(&self, table: &str, thread: i64) -> (Arc<PoolEntry>, bool) {
        match self.entries.entry(table.to_string()) {
            MapEntry::Occupied(occupied) => (Arc::clone(occupied.get()), false),
            MapEntry::Vacant(vacant) => {
                // The inserting thread starts out as owner, so nobody can
                // CAS in before the insert settles.
                let fresh = Arc::new(PoolEntry::new(thread, self.clock.ticks()));
                vacant.insert(Arc::clone(&fresh));
                (fresh, true)
            }
        }
    }

    fn acquire(
        self: &Arc<Self>,
        table: &str,
        reason: &str,
        mut write_action: Option<&mut dyn FnMut(&mut WriterCommand)>,
    ) -> PoolResult<Acquired> {
        debug_assert!(!reason.is_empty(), "ownership reason must be non-empty");
        self.ensure_open()?;
        let thread = current_thread_id();

        loop {
            let (entry, inserted) = self.find_or_insert(table, thread);
            if inserted {
                return self
                    .create_writer(table, &entry, thread, reason)
                    .map(Acquired::Writer);
            }

            match entry.owner.compare_exchange(
                UNALLOCATED,
                thread,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    // In an extreme race the writer slot can still be empty
                    // here; behave exactly as if the entry were missing.
                    let cached = entry.writer.lock().clone();
                    return match cached {
                        None => self
                            .create_writer(table, &entry, thread, reason)
                            .map(Acquired::Writer),
                        Some(writer) => self
                            .hand_out_cached(table, &entry, thread, reason, writer)
                            .map(Acquired::Writer),
                    };
                }
                Err(current) => {
                    if current < 0 {
                        // The eviction job is tearing the entry down (or the
                        // owner word is mid-flight); it resolves shortly.
                        std::hint::spin_loop();
                        continue;
                    }
                    if current == thread {
                        if entry.lock.lock().is_some() {
                            let reason =
                                reinterpret_reason(entry.ownership_reason.lock().clone());
                            return Err(PoolError::EntryLocked {
                                table: table.to_string(),
                                reason,
                            });
                        }
                        let cached_err = entry.ex.lock().clone();
                        if let Some(err) = cached_err {
                            // This very thread failed to construct the
                            // writer; serve the identical outcome once, then
                            // free the name for a fresh attempt.
                            self.notify(thread, Some(table), PoolEvent::ExResend);
                            self.entries.remove(table);
                            return Err(PoolError::Writer(err));
                        }
                    }
                    if let Some(action) = write_action.take() {
                        self.add_command_to_writer_queue(table, &entry, action)?;
                        return Ok(Acquired::Published);
                    }
                    self.metrics.incr_busy_conflicts();
                    let reason = reinterpret_reason(entry.ownership_reason.lock().clone());
                    info!(table, owner = current, thread, "busy");
                    return Err(PoolError::EntryUnavailable {
                        table: table.to_string(),
                        reason,
                    });
                }
            }
        }
    }

    fn create_writer(
        self: &Arc<Self>,
        table: &str,
        entry: &Arc<PoolEntry>,
        thread: i64,
        reason: &str,
    ) -> PoolResult<PooledWriter> {
        self.ensure_open()?;
        info!(table, thread, "open");
        let request = OpenWriterRequest {
            table,
            root: &self.config.root,
            new_table: false,
        };
        match self.factory.open_writer(&request) {
            Ok(writer) => {
                *entry.writer.lock() = Some(Arc::clone(&writer));
                *entry.ownership_reason.lock() = Some(reason.to_string());
                self.metrics.incr_created();
                self.notify(thread, Some(table), PoolEvent::Create);
                Ok(PooledWriter {
                    pool: Arc::clone(self),
                    entry: Arc::clone(entry),
                    writer,
                    detached: false,
                })
            }
            Err(err) => {
                error!(table, thread, ex = %err, "could not open writer");
                *entry.ex.lock() = Some(err.clone());
                *entry.ownership_reason.lock() =
                    Some(OWNERSHIP_REASON_WRITER_ERROR.to_string());
                // The failing thread stays the recorded owner so its next
                // acquire re-sees this exact error; everyone else is told the
                // writer errored. Eviction purges the entry if nobody comes
                // back for it.
                self.metrics.incr_creation_failures();
                self.notify(thread, Some(table), PoolEvent::CreateError);
                Err(PoolError::Writer(err))
            }
        }
    }

    fn hand_out_cached(
        self: &Arc<Self>,
        table: &str,
        entry: &Arc<PoolEntry>,
        thread: i64,
        reason: &str,
        writer: Arc<dyn TableWriter>,
    ) -> PoolResult<PooledWriter> {
        if self.is_closed() {
            // Pool closed between the CAS and here. Hand the writer out
            // detached so the caller's close tears it down directly.
            info!(table, "born free");
            *entry.writer.lock() = None;
            return Ok(PooledWriter {
                pool: Arc::clone(self),
                entry: Arc::clone(entry),
                writer,
                detached: true,
            });
        }
        *entry.ownership_reason.lock() = Some(reason.to_string());
        self.metrics.incr_reused();
        debug!(table, thread, "handed out");
        self.notify(thread, Some(table), PoolEvent::Get);
        Ok(PooledWriter {
            pool: Arc::clone(self),
            entry: Arc::clone(entry),
            writer,
            detached: false,
        })
    }

    fn add_command_to_writer_queue(
        &self,
        table: &str,
        entry: &Arc<PoolEntry>,
        write: &mut dyn FnMut(&mut WriterCommand),
    ) -> PoolResult<()> {
        let writer = loop {
            if let Some(writer) = entry.writer.lock().clone() {
                break Some(writer);
            }
            if entry.owner.load(Ordering::Acquire) == UNALLOCATED {
                break None;
            }
            std::hint::spin_loop();
        };
        match writer {
            Some(writer) => {
                // The writer's own publish protocol takes over; no pool
                // state is held across this call.
                writer.process_command_async(write);
                self.metrics.incr_commands_published();
                Ok(())
            }
            // Evicted between the owner observation and the writer read;
            // the caller restarts from the very beginning.
            None => Err(PoolError::EntryUnavailable {
                table: table.to_string(),
                reason: OWNERSHIP_REASON_PLEASE_RETRY.to_string(),
            }),
        }
    }

    fn lock(&self, table: &str, reason: &str) -> PoolResult<()> {
        debug_assert!(!reason.is_empty(), "lock reason must be non-empty");
        self.ensure_open()?;
        let thread = current_thread_id();

        let (entry, inserted) = self.find_or_insert(table, thread);
        if inserted {
            if self.lock_and_notify(thread, &entry, table, reason) {
                return Ok(());
            }
            self.entries.remove(table);
            self.metrics.incr_lock_conflicts();
            return Err(PoolError::EntryUnavailable {
                table: table.to_string(),
                reason: reinterpret_reason(entry.ownership_reason.lock().clone()),
            });
        }

        if entry
            .owner
            .compare_exchange(UNALLOCATED, thread, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.close_writer(thread, &entry, PoolEvent::LockClose, CloseReason::NameLock);
            if self.lock_and_notify(thread, &entry, table, reason) {
                return Ok(());
            }
            self.metrics.incr_lock_conflicts();
            return Err(PoolError::EntryUnavailable {
                table: table.to_string(),
                reason: reinterpret_reason(entry.ownership_reason.lock().clone()),
            });
        }

        error!(
            table,
            owner = entry.owner.load(Ordering::Relaxed),
            thread,
            "could not lock, busy"
        );
        self.notify(thread, Some(table), PoolEvent::LockBusy);
        self.metrics.incr_lock_conflicts();
        let reason = reinterpret_reason(entry.ownership_reason.lock().clone());
        Err(PoolError::EntryUnavailable {
            table: table.to_string(),
            reason,
        })
    }

    fn lock_and_notify(
        &self,
        thread: i64,
        entry: &Arc<PoolEntry>,
        table: &str,
        reason: &str,
    ) -> bool {
        let path = fs::lock_path(&self.config.root, table);
        match fs::TableLock::acquire(path) {
            Ok(lock) => {
                *entry.lock.lock() = Some(lock);
                *entry.ownership_reason.lock() = Some(reason.to_string());
                self.metrics.incr_locks_acquired();
                debug!(table, thread, "locked");
                self.notify(thread, Some(table), PoolEvent::LockSuccess);
                true
            }
            Err(err) => {
                error!(table, thread, %err, "could not lock name");
                *entry.ownership_reason.lock() =
                    Some(OWNERSHIP_REASON_MISSING.to_string());
                entry.owner.store(UNALLOCATED, Ordering::Release);
                false
            }
        }
    }

    fn unlock(
        &self,
        table: &str,
        writer: Option<Arc<dyn TableWriter>>,
        new_table: bool,
    ) -> PoolResult<()> {
        let thread = current_thread_id();

        let Some(entry) = self.entries.get(table).map(|item| Arc::clone(item.value()))
        else {
            self.notify(thread, Some(table), PoolEvent::NotLocked);
            return Ok(());
        };

        if entry.owner.load(Ordering::Acquire) != thread {
            self.notify(thread, Some(table), PoolEvent::NotLockOwner);
            return Err(PoolError::NotLockOwner {
                table: table.to_string(),
            });
        }

        // While locked the writer slot must be empty; anything else means
        // the caller is unlocking a name it never locked.
        if entry.writer.lock().is_some() {
            self.notify(thread, Some(table), PoolEvent::NotLocked);
            return Err(PoolError::NotLocked {
                table: table.to_string(),
            });
        }

        let mut writer = writer;
        if new_table {
            debug_assert!(writer.is_none() && entry.lock.lock().is_some());
            // Install the freshly created table's first writer while the
            // name is still held: directory visibility can lag across
            // threads, and caching the writer here makes every subsequent
            // access go through the pool instead of the filesystem.
            let request = OpenWriterRequest {
                table,
                root: &self.config.root,
                new_table: true,
            };
            let created = self.factory.open_writer(&request)?;
            info!(table, thread, "created");
            self.metrics.incr_created();
            writer = Some(created);
        }

        match writer {
            None => {
                if let Some(lock) = entry.lock.lock().take() {
                    lock.release_and_remove();
                }
                // The pool does not deal in writerless entries; the name is
                // free for any thread to re-create.
                self.entries.remove(table);
            }
            Some(writer) => {
                if let Some(lock) = entry.lock.lock().take() {
                    writer.transfer_lock(lock);
                }
                *entry.writer.lock() = Some(writer);
                *entry.ownership_reason.lock() = None;
                entry.owner.store(UNALLOCATED, Ordering::Release);
            }
        }
        self.notify(thread, Some(table), PoolEvent::Unlocked);
        debug!(table, thread, "unlocked");
        Ok(())
    }

    fn return_to_pool(&self, entry: &Arc<PoolEntry>, writer: &Arc<dyn TableWriter>) {
        let thread = current_thread_id();
        let name = writer.table_name().to_string();

        // Let the writer apply structural commands queued during this
        // tenure before it becomes visible to the next caller.
        let maintenance = writer.rollback().and_then(|_| writer.tick(true));
        if let Err(err) = maintenance {
            // Systemic failure, disk-full and the like: never cache a
            // writer that could not roll back.
            error!(table = %name, %err, "distressed on return");
            self.entries.remove(&name);
            self.close_writer(thread, entry, PoolEvent::LockClose, CloseReason::Distressed);
            return;
        }

        if entry.owner.load(Ordering::Acquire) != UNALLOCATED {
            debug!(table = %name, thread, "returned");
            *entry.ownership_reason.lock() = None;
            entry
                .last_release_time
                .store(self.clock.ticks(), Ordering::Release);
            entry.owner.store(UNALLOCATED, Ordering::Release);

            if self.is_closed() {
                // The closing thread may be draining entries right now;
                // grab the writer back before declaring it a free agent.
                if entry
                    .owner
                    .compare_exchange(UNALLOCATED, thread, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    *entry.writer.lock() = None;
                    self.notify(thread, Some(&name), PoolEvent::OutOfPoolClose);
                    writer.close();
                    return;
                }
            }
            self.notify(thread, Some(&name), PoolEvent::Return);
        } else {
            error!(table = %name, "orphaned writer returned");
            self.notify(thread, Some(&name), PoolEvent::UnexpectedClose);
        }
    }

    /// Physically closes the entry's cached writer, if any. Returns whether
    /// a writer was actually closed.
    fn close_writer(
        &self,
        thread: i64,
        entry: &Arc<PoolEntry>,
        event: PoolEvent,
        reason: CloseReason,
    ) -> bool {
        let taken = entry.writer.lock().take();
        match taken {
            Some(writer) => {
                let name = writer.table_name().to_string();
                writer.close();
                *entry.ownership_reason.lock() = Some(OWNERSHIP_REASON_RELEASED.to_string());
                info!(table = %name, reason = %reason, by = thread, "closed");
                self.notify(thread, Some(&name), event);
                true
            }
            None => false,
        }
    }

    pub(crate) fn release_all(&self, deadline: u64) -> bool {
        let thread = current_thread_id();
        let reason = if deadline == u64::MAX {
            CloseReason::PoolClose
        } else {
            CloseReason::Idle
        };
        let mut removed = false;

        let names: Vec<String> = self.entries.iter().map(|item| item.key().clone()).collect();
        for name in names {
            let Some(entry) = self.entries.get(&name).map(|item| Arc::clone(item.value()))
            else {
                continue;
            };
            let last_release = entry.last_release_time.load(Ordering::Acquire);
            if deadline > last_release && entry.owner.load(Ordering::Acquire) == UNALLOCATED {
                // Park a negative id in the owner word so a concurrent
                // acquirer waits out the teardown instead of fighting it.
                if entry
                    .owner
                    .compare_exchange(
                        UNALLOCATED,
                        eviction_sentinel(thread),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
                {
                    if self.close_writer(thread, &entry, PoolEvent::Expire, reason) {
                        self.metrics.incr_expired();
                    }
                    self.entries.remove(&name);
                    removed = true;
                }
            } else {
                let mut lock_slot = entry.lock.lock();
                if deadline == u64::MAX && lock_slot.is_some() {
                    // Lock fds are only surrendered on shutdown; the file
                    // itself stays for whichever process owns the rename.
                    *lock_slot = None;
                    drop(lock_slot);
                    self.entries.remove(&name);
                    removed = true;
                } else {
                    drop(lock_slot);
                    if entry.ex.lock().is_some() {
                        info!(table = %name, "purging entry for failed writer allocation");
                        self.entries.remove(&name);
                        removed = true;
                    }
                }
            }
        }
        removed
    }

    pub(crate) fn release_inactive(&self) -> bool {
        let deadline = self
            .clock
            .ticks()
            .saturating_sub(self.config.inactive_writer_ttl_us);
        self.release_all(deadline)
    }

    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let thread = current_thread_id();
        while self.release_all(u64::MAX) {}
        info!("closed");
        self.notify(thread, None, PoolEvent::PoolClosed);
    }
}

/// Thread-safe cache of open table writers.
///
/// Amortises the cost of opening and closing on-disk writer state while
/// abiding by the same rule as non-pooled writers: one writer instance per
/// table name. A writer allocated by one thread cannot be touched by any
/// other thread until it is released back via its close path. Idle writers
/// are expunged by [`release_inactive`], typically driven by a
/// [`PoolJanitor`](crate::janitor::PoolJanitor).
///
/// [`release_inactive`]: WriterPool::release_inactive
pub struct WriterPool {
    pub(crate) inner: Arc<PoolInner>,
}

impl WriterPool {
    pub fn new(config: PoolConfig, factory: Arc<dyn WriterFactory>) -> Self {
        Self::from_parts(
            config,
            factory,
            Arc::new(OsMicrosecondClock),
            Arc::new(NoopListener),
        )
    }

    pub fn from_parts(
        config: PoolConfig,
        factory: Arc<dyn WriterFactory>,
        clock: Arc<dyn MicrosecondClock>,
        listener: Arc<dyn PoolListener>,
    ) -> Self {
        let inner = Arc::new(PoolInner {
            config,
            entries: DashMap::new(),
            factory,
            clock,
            listener,
            metrics: PoolMetrics::default(),
            closed: AtomicBool::new(false),
        });
        info!(root = %inner.config.root.display(), "open");
        inner.notify(current_thread_id(), None, PoolEvent::PoolOpen);
        Self { inner }
    }

    /// Creates or retrieves the writer for `table`, uniquely owned by the
    /// calling thread until released via its close path.
    ///
    /// `reason` is a non-empty diagnostic recorded for the duration of the
    /// tenure; a refused caller is told this reason.
    pub fn get(&self, table: &str, reason: &str) -> PoolResult<PooledWriter> {
        match self.inner.acquire(table, reason, None)? {
            Acquired::Writer(writer) => Ok(writer),
            Acquired::Published => unreachable!("no command action supplied"),
        }
    }

    /// Like [`get`], but when the writer is busy the supplied action is
    /// written to its inbound command queue instead, returning `None`.
    /// The busy writer applies the command on its next maintenance tick.
    ///
    /// [`get`]: WriterPool::get
    pub fn get_or_publish_command(
        &self,
        table: &str,
        reason: &str,
        write_action: &mut dyn FnMut(&mut WriterCommand),
    ) -> PoolResult<Option<PooledWriter>> {
        loop {
            match self.inner.acquire(table, reason, Some(&mut *write_action)) {
                Ok(Acquired::Writer(writer)) => return Ok(Some(writer)),
                Ok(Acquired::Published) => return Ok(None),
                // The writer slipped away mid-publish; start over.
                Err(PoolError::EntryUnavailable { .. }) => continue,
                Err(other) => return Err(other),
            }
        }
    }

    /// Takes a durable, cross-process exclusive hold on a table name,
    /// closing any cached writer for it. Non-blocking and non-reentrant:
    /// a busy or already-locked name fails immediately, carrying the
    /// holder's reason.
    ///
    /// Locking a name is what makes rename, drop and create safe.
    pub fn lock(&self, table: &str, reason: &str) -> PoolResult<()> {
        self.inner.lock(table, reason)
    }

    /// Releases a name lock taken by this thread, removing the lock file
    /// and freeing the name.
    pub fn unlock(&self, table: &str) -> PoolResult<()> {
        self.inner.unlock(table, None, false)
    }

    /// Releases a name lock, optionally installing a writer for the name.
    ///
    /// With `new_table` set the pool constructs the freshly created table's
    /// first writer itself and caches it before any other thread can see
    /// the directory; the on-disk name lock is transferred to that writer.
    pub fn unlock_with(
        &self,
        table: &str,
        writer: Option<Arc<dyn TableWriter>>,
        new_table: bool,
    ) -> PoolResult<()> {
        self.inner.unlock(table, writer, new_table)
    }

    /// Reclaims idle entries released before `deadline_us`. A deadline of
    /// `u64::MAX` is the shutdown pass: it also surrenders lock fds.
    /// Returns true when anything was removed, signalling the scheduler to
    /// run again sooner.
    pub fn release_all(&self, deadline_us: u64) -> bool {
        self.inner.release_all(deadline_us)
    }

    /// Reclaims entries idle past the configured TTL.
    pub fn release_inactive(&self) -> bool {
        self.inner.release_inactive()
    }

    /// Closes the pool. Idempotent. Cached writers are released proactively;
    /// writers currently in callers' hands close physically when their
    /// holders release them.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Number of entries, busy or not. Approximate under concurrency.
    pub fn size(&self) -> usize {
        self.inner.entries.len()
    }

    /// Number of entries currently owned by some thread. Approximate.
    pub fn busy_count(&self) -> usize {
        self.inner
            .entries
            .iter()
            .filter(|item| item.value().owner.load(Ordering::Relaxed) != UNALLOCATED)
            .count()
    }

    /// Number of idle cached entries. Approximate; logs the tables that are
    /// still busy.
    pub fn free_count(&self) -> usize {
        let mut count = 0;
        for item in self.inner.entries.iter() {
            let owner = item.value().owner.load(Ordering::Relaxed);
            if owner == UNALLOCATED {
                count += 1;
            } else {
                info!(table = %item.key(), owner, "still busy");
            }
        }
        count
    }

    pub fn metrics(&self) -> PoolMetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl Drop for WriterPool {
    fn drop(&mut self) {
        self.inner.close();
    }
}
