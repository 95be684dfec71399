use std::sync::Arc;
use std::thread;

use tempfile::TempDir;
use writer_pool::test_support::{MockWriterFactory, RecordingListener};
use writer_pool::{
    OsMicrosecondClock, PoolConfig, PoolError, PoolEvent, WriterError, WriterPool,
};

fn pool_fixture(
    dir: &TempDir,
) -> (Arc<WriterPool>, Arc<MockWriterFactory>, Arc<RecordingListener>) {
    let factory = Arc::new(MockWriterFactory::new());
    let listener = Arc::new(RecordingListener::default());
    let pool = Arc::new(WriterPool::from_parts(
        PoolConfig::new(dir.path()),
        factory.clone(),
        Arc::new(OsMicrosecondClock),
        listener.clone(),
    ));
    (pool, factory, listener)
}

#[test]
fn busy_writer_reports_holder_reason_then_frees_up() {
    let dir = TempDir::new().expect("tempdir");
    let (pool, factory, _listener) = pool_fixture(&dir);

    let held = pool.get("t1", "ingest").expect("create");
    thread::scope(|scope| {
        scope.spawn(|| match pool.get("t1", "alter") {
            Err(PoolError::EntryUnavailable { reason, .. }) => assert_eq!(reason, "ingest"),
            other => panic!("expected busy, got {other:?}"),
        });
    });

    held.close();
    thread::scope(|scope| {
        scope.spawn(|| {
            pool.get("t1", "alter").expect("acquire after release").close();
        });
    });
    assert_eq!(factory.created_count(), 1);
}

#[test]
fn name_lock_is_non_blocking_and_succeeds_once_writer_returns() {
    let dir = TempDir::new().expect("tempdir");
    let (pool, _factory, listener) = pool_fixture(&dir);

    let held = pool.get("t1", "ingest").expect("create");
    thread::scope(|scope| {
        scope.spawn(|| match pool.lock("t1", "rename") {
            Err(PoolError::EntryUnavailable { reason, .. }) => assert_eq!(reason, "ingest"),
            other => panic!("expected lock refusal, got {other:?}"),
        });
    });
    assert_eq!(listener.count(PoolEvent::LockBusy), 1);

    held.close();
    // Lock and unlock must happen on the locking thread.
    thread::scope(|scope| {
        scope.spawn(|| {
            pool.lock("t1", "rename").expect("lock after release");
            pool.unlock("t1").expect("unlock");
        });
    });
    assert_eq!(listener.count(PoolEvent::LockSuccess), 1);
}

#[test]
fn locked_name_excludes_writer_creation() {
    let dir = TempDir::new().expect("tempdir");
    let (pool, factory, _listener) = pool_fixture(&dir);

    pool.lock("t1", "drop table").expect("lock");
    thread::scope(|scope| {
        scope.spawn(|| match pool.get("t1", "ingest") {
            Err(PoolError::EntryUnavailable { reason, .. }) => {
                assert_eq!(reason, "drop table")
            }
            other => panic!("expected refusal, got {other:?}"),
        });
    });
    assert_eq!(factory.created_count(), 0);
    pool.unlock("t1").expect("unlock");
}

#[test]
fn unlock_from_wrong_thread_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let (pool, _factory, listener) = pool_fixture(&dir);

    pool.lock("t1", "rename").expect("lock");
    thread::scope(|scope| {
        scope.spawn(|| {
            assert!(matches!(
                pool.unlock("t1"),
                Err(PoolError::NotLockOwner { .. })
            ));
        });
    });
    assert_eq!(listener.count(PoolEvent::NotLockOwner), 1);
    pool.unlock("t1").expect("owner unlock");
}

#[test]
fn create_table_unlock_serves_the_installed_writer() {
    let dir = TempDir::new().expect("tempdir");
    let (pool, factory, _listener) = pool_fixture(&dir);

    pool.lock("t1", "create table").expect("lock");
    pool.unlock_with("t1", None, true).expect("publish new table");
    let installed = factory.last_writer().expect("installed writer");
    assert!(installed.holds_lock());
    installed.counter.bump();

    // Another thread's first acquire sees the installed writer, including
    // the write that happened before publication.
    thread::scope(|scope| {
        scope.spawn(|| {
            let writer = pool.get("t1", "ingest").expect("acquire");
            let mock = factory.writer_for("t1").expect("mock");
            assert_eq!(mock.counter.get(), 1);
            writer.close();
        });
    });
    assert_eq!(factory.created_count(), 1);
}

#[test]
fn creation_failure_replays_to_the_failing_thread_only() {
    let dir = TempDir::new().expect("tempdir");
    let (pool, factory, _listener) = pool_fixture(&dir);

    factory.fail_next_open(WriterError::with_errno("disk full", 28));
    let first = pool
        .get("t1", "ingest")
        .map(|_| ())
        .expect_err("construction fails");
    assert!(first.to_string().contains("disk full"));

    // Another thread is merely told the writer errored; the cached error is
    // not burned on it.
    thread::scope(|scope| {
        scope.spawn(|| match pool.get("t1", "other") {
            Err(PoolError::EntryUnavailable { reason, .. }) => {
                assert_eq!(reason, "writer error")
            }
            other => panic!("expected busy, got {other:?}"),
        });
    });

    // The failing thread gets the identical outcome once more, then the
    // entry is gone and creation is attempted afresh.
    let replay = pool
        .get("t1", "ingest")
        .map(|_| ())
        .expect_err("replayed error");
    assert_eq!(replay.to_string(), first.to_string());
    assert_eq!(factory.created_count(), 0);
    pool.get("t1", "ingest").expect("fresh creation").close();
    assert_eq!(factory.created_count(), 1);
}

#[test]
fn refusals_always_carry_a_reason() {
    let dir = TempDir::new().expect("tempdir");
    let (pool, _factory, _listener) = pool_fixture(&dir);

    let held = pool.get("t1", "ingest").expect("create");
    let busy = pool.get("t1", "alter").map(|_| ()).expect_err("busy");
    assert!(!busy.reason().expect("reason").is_empty());
    held.close();

    pool.lock("t1", "rename").expect("lock");
    let locked = pool.get("t1", "ingest").map(|_| ()).expect_err("locked");
    assert!(matches!(locked, PoolError::EntryLocked { .. }));
    assert!(!locked.reason().expect("reason").is_empty());
    pool.unlock("t1").expect("unlock");
}
