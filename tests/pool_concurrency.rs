use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use writer_pool::test_support::MockWriterFactory;
use writer_pool::{PoolConfig, PoolError, TableWriter, WriterPool};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn pool_fixture(dir: &TempDir) -> (Arc<WriterPool>, Arc<MockWriterFactory>) {
    let factory = Arc::new(MockWriterFactory::new());
    let pool = Arc::new(WriterPool::new(PoolConfig::new(dir.path()), factory.clone()));
    (pool, factory)
}

#[test]
fn single_writer_per_table_under_contention() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let (pool, factory) = pool_fixture(&dir);

    const THREADS: usize = 8;
    const ACQUIRES_PER_THREAD: usize = 200;
    let holders = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                let mut acquired = 0;
                while acquired < ACQUIRES_PER_THREAD {
                    match pool.get("t1", "contend") {
                        Ok(writer) => {
                            let concurrent = holders.fetch_add(1, Ordering::SeqCst) + 1;
                            assert_eq!(concurrent, 1, "two live holders for one table");
                            holders.fetch_sub(1, Ordering::SeqCst);
                            writer.close();
                            acquired += 1;
                        }
                        Err(PoolError::EntryUnavailable { reason, .. }) => {
                            assert!(!reason.is_empty());
                            thread::yield_now();
                        }
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
            });
        }
    });

    // The writer was constructed once and reused throughout.
    assert_eq!(factory.created_count(), 1);
}

#[test]
fn release_happens_before_next_acquire() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let (pool, factory) = pool_fixture(&dir);

    const THREADS: usize = 4;
    const BUMPS_PER_THREAD: usize = 500;

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                let mut bumped = 0;
                while bumped < BUMPS_PER_THREAD {
                    match pool.get("t1", "bump") {
                        Ok(writer) => {
                            // The counter is deliberately unsynchronised;
                            // only the owner handoff orders these accesses.
                            let mock = factory.writer_for("t1").expect("mock");
                            mock.counter.bump();
                            writer.close();
                            bumped += 1;
                        }
                        Err(PoolError::EntryUnavailable { .. }) => thread::yield_now(),
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
            });
        }
    });

    assert_eq!(factory.created_count(), 1);
    let mock = factory.writer_for("t1").expect("mock");
    assert_eq!(mock.counter.get(), (THREADS * BUMPS_PER_THREAD) as u64);
}

#[test]
fn eviction_never_merges_with_a_concurrent_acquire() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let (pool, _factory) = pool_fixture(&dir);

    // Any idle entry is older than this deadline, so every pass is a
    // genuine eviction attempt racing the acquire.
    const DEADLINE: u64 = u64::MAX - 1;

    for _ in 0..200 {
        pool.get("t1", "seed").expect("seed").close();
        thread::scope(|scope| {
            scope.spawn(|| {
                pool.release_all(DEADLINE);
            });
            scope.spawn(|| {
                // The acquirer either wins the CAS and reuses the cached
                // writer, or waits out the sentinel and constructs a fresh
                // one; it must never observe a torn writer.
                let writer = pool.get("t1", "race").expect("acquire during eviction");
                assert_eq!(writer.table_name(), "t1");
                writer.close();
            });
        });
    }
}

#[test]
fn command_published_to_busy_writer_applies_on_release() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let (pool, factory) = pool_fixture(&dir);

    let held = pool.get("t1", "ingest").expect("create");
    let (published_tx, published_rx) = mpsc::channel();

    thread::scope(|scope| {
        scope.spawn(|| {
            let outcome = pool
                .get_or_publish_command("t1", "alter", &mut |command| {
                    command.code = 1;
                    command.payload = b"alter table add column price double".to_vec();
                })
                .expect("publish");
            assert!(outcome.is_none(), "writer is busy, command must be queued");
            published_tx.send(()).expect("signal");
        });

        published_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("publish completed");
        let mock = factory.writer_for("t1").expect("mock");
        assert_eq!(mock.queued_commands().len(), 1);
        assert!(mock.applied_commands().is_empty());

        // Releasing the writer ticks it contention-free, applying the
        // queued structural change.
        held.close();
        assert_eq!(mock.applied_commands().len(), 1);
        assert_eq!(
            mock.applied_commands()[0].payload,
            b"alter table add column price double"
        );
    });
}

#[test]
fn close_during_traffic_leaves_no_live_writers() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let (pool, factory) = pool_fixture(&dir);

    thread::scope(|scope| {
        for worker in 0..4usize {
            let pool = Arc::clone(&pool);
            let table = format!("t{}", worker % 2);
            scope.spawn(move || loop {
                match pool.get(&table, "churn") {
                    Ok(writer) => {
                        thread::yield_now();
                        writer.close();
                    }
                    Err(PoolError::EntryUnavailable { .. }) => thread::yield_now(),
                    Err(PoolError::PoolClosed) => break,
                    Err(other) => panic!("unexpected error: {other}"),
                }
            });
        }
        thread::sleep(Duration::from_millis(50));
        pool.close();
        pool.close();
    });

    // Every writer the factory ever produced was physically closed, either
    // by the shutdown drain or by its holder's release path.
    assert!(factory.created_count() > 0);
    for mock in factory.writers() {
        assert!(mock.is_closed(), "writer for {} leaked", mock.table_name());
    }
    assert!(matches!(
        pool.get("t0", "late"),
        Err(PoolError::PoolClosed)
    ));
}
