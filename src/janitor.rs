//! Background reclamation of idle writers.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, trace, warn};

use crate::pool::{PoolInner, WriterPool};

/// Floor for the tightened interval after a pass that reclaimed something.
const MIN_TICK: Duration = Duration::from_millis(1);

enum JanitorCommand {
    /// Run an eviction pass immediately.
    RunNow,
    Shutdown,
}

/// Handle to the background thread that periodically evicts idle writers.
///
/// The worker calls the pool's inactive-release pass on a timer, tightening
/// the interval after any pass that removed entries so bursts of expiry
/// drain quickly. Dropping the handle (or calling [`shutdown`]) stops and
/// joins the worker.
///
/// [`shutdown`]: PoolJanitor::shutdown
pub struct PoolJanitor {
    commands: Sender<JanitorCommand>,
    worker: Option<JoinHandle<()>>,
}

impl PoolJanitor {
    fn spawn(pool: Arc<PoolInner>, interval: Duration) -> Self {
        let (tx, rx) = unbounded();
        let worker = thread::Builder::new()
            .name("writer-pool-janitor".to_string())
            .spawn(move || run(pool, rx, interval))
            .expect("spawn janitor thread");
        Self {
            commands: tx,
            worker: Some(worker),
        }
    }

    /// Asks the worker for an immediate eviction pass.
    pub fn run_now(&self) {
        let _ = self.commands.send(JanitorCommand::RunNow);
    }

    /// Stops the worker and joins it.
    pub fn shutdown(&mut self) {
        let _ = self.commands.send(JanitorCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("janitor thread panicked");
            }
        }
    }
}

impl Drop for PoolJanitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(pool: Arc<PoolInner>, commands: Receiver<JanitorCommand>, interval: Duration) {
    let mut wait = interval;
    loop {
        match commands.recv_timeout(wait) {
            Ok(JanitorCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(JanitorCommand::RunNow) => {
                pool.release_inactive();
                wait = interval;
            }
            Err(RecvTimeoutError::Timeout) => {
                if pool.is_closed() {
                    debug!("pool closed, janitor exiting");
                    break;
                }
                let removed = pool.release_inactive();
                trace!(removed, "janitor pass");
                // A pass that reclaimed something hints more entries are
                // about to expire; come back sooner.
                wait = if removed {
                    (interval / 4).max(MIN_TICK)
                } else {
                    interval
                };
            }
        }
    }
}

impl WriterPool {
    /// Starts a janitor thread that evicts idle writers every `interval`.
    pub fn start_janitor(&self, interval: Duration) -> PoolJanitor {
        PoolJanitor::spawn(Arc::clone(&self.inner), interval)
    }
}
