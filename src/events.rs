use std::fmt::{Display, Formatter};

/// Structured notification points emitted by the pool.
///
/// Events are observability only: pool behaviour never depends on whether a
/// listener is installed or on what it does with the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
    PoolOpen,
    PoolClosed,
    /// A cached writer was handed to a caller.
    Get,
    /// A writer was constructed on behalf of a caller.
    Create,
    /// Writer construction failed.
    CreateError,
    /// A cached creation error was re-served to the thread that caused it.
    ExResend,
    /// A writer came back to the pool through its close path.
    Return,
    /// A writer was physically closed because the pool shut down while it
    /// was in a caller's hands.
    OutOfPoolClose,
    /// Release was observed on an entry nobody owned (double close).
    UnexpectedClose,
    /// An idle writer was evicted.
    Expire,
    LockSuccess,
    LockBusy,
    /// A cached writer was physically closed to make way for a name lock
    /// (or because it was distressed).
    LockClose,
    Unlocked,
    NotLocked,
    NotLockOwner,
}

impl Display for PoolEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            PoolEvent::PoolOpen => "pool_open",
            PoolEvent::PoolClosed => "pool_closed",
            PoolEvent::Get => "get",
            PoolEvent::Create => "create",
            PoolEvent::CreateError => "create_error",
            PoolEvent::ExResend => "ex_resend",
            PoolEvent::Return => "return",
            PoolEvent::OutOfPoolClose => "out_of_pool_close",
            PoolEvent::UnexpectedClose => "unexpected_close",
            PoolEvent::Expire => "expire",
            PoolEvent::LockSuccess => "lock_success",
            PoolEvent::LockBusy => "lock_busy",
            PoolEvent::LockClose => "lock_close",
            PoolEvent::Unlocked => "unlocked",
            PoolEvent::NotLocked => "not_locked",
            PoolEvent::NotLockOwner => "not_lock_owner",
        };
        f.write_str(text)
    }
}

/// Why a cached writer was physically closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Closed to clear the way for an administrative name lock.
    NameLock,
    /// Idle past the inactive-writer TTL.
    Idle,
    /// Pool shutdown.
    PoolClose,
    /// Rollback failed on return; the writer cannot be cached.
    Distressed,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::NameLock => "name_lock",
            CloseReason::Idle => "idle",
            CloseReason::PoolClose => "pool_close",
            CloseReason::Distressed => "distressed",
        }
    }
}

impl Display for CloseReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pluggable observer for pool activity.
///
/// `thread` is the pool-local id of the thread the event happened on and
/// `table` is the affected table, when there is one.
pub trait PoolListener: Send + Sync {
    fn on_event(&self, thread: i64, table: Option<&str>, event: PoolEvent);
}

/// Listener that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl PoolListener for NoopListener {
    fn on_event(&self, _thread: i64, _table: Option<&str>, _event: PoolEvent) {}
}
