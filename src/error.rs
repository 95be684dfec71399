use std::fmt::{self, Display, Formatter};
use std::io;

/// Structured error produced by a table writer's constructor or one of its
/// maintenance calls (`rollback`, `tick`).
///
/// Carries a short message and, when the failure came from the operating
/// system, the raw errno. The pool caches this error verbatim so that the
/// thread whose creation attempt failed observes the same outcome on its
/// next attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterError {
    message: String,
    errno: Option<i32>,
}

impl WriterError {
    pub fn new<T: Display>(message: T) -> Self {
        Self {
            message: message.to_string(),
            errno: None,
        }
    }

    pub fn with_errno<T: Display>(message: T, errno: i32) -> Self {
        Self {
            message: message.to_string(),
            errno: Some(errno),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn errno(&self) -> Option<i32> {
        self.errno
    }
}

impl Display for WriterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.errno {
            Some(errno) => write!(f, "{} [errno={}]", self.message, errno),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for WriterError {}

impl From<io::Error> for WriterError {
    fn from(err: io::Error) -> Self {
        Self {
            errno: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}

/// A specialized error type for writer pool operations.
///
/// None of these crash the pool and none are retried internally; busy and
/// locked outcomes are retryable by the caller after back-off, while writer
/// creation failures are retried by simply re-entering the acquire path.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    /// The pool is shutting down; permanent for the process lifetime.
    #[error("writer pool is closed")]
    PoolClosed,
    /// Another thread currently owns the writer; retryable.
    #[error("writer for table `{table}` is busy: {reason}")]
    EntryUnavailable { table: String, reason: String },
    /// The calling thread observed its own entry in name-locked state.
    #[error("table `{table}` is locked: {reason}")]
    EntryLocked { table: String, reason: String },
    /// Unlock was called on an entry that is not in locked state.
    #[error("writer for table `{table}` is not locked")]
    NotLocked { table: String },
    /// Unlock was called by a thread that does not hold the lock.
    #[error("not lock owner of table `{table}`")]
    NotLockOwner { table: String },
    /// The underlying writer constructor or maintenance call failed.
    #[error(transparent)]
    Writer(#[from] WriterError),
}

impl PoolError {
    /// The diagnostic reason attached to a busy or locked outcome, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            PoolError::EntryUnavailable { reason, .. } => Some(reason),
            PoolError::EntryLocked { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// A Result type alias for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_error_display_includes_errno() {
        let err = WriterError::with_errno("disk full", 28);
        assert_eq!(err.to_string(), "disk full [errno=28]");
        assert_eq!(WriterError::new("boom").to_string(), "boom");
    }

    #[test]
    fn pool_error_exposes_reason() {
        let err = PoolError::EntryUnavailable {
            table: "trades".to_string(),
            reason: "ingest".to_string(),
        };
        assert_eq!(err.reason(), Some("ingest"));
        assert!(PoolError::PoolClosed.reason().is_none());
    }

    #[test]
    fn io_error_carries_raw_errno() {
        let err = WriterError::from(io::Error::from_raw_os_error(28));
        assert_eq!(err.errno(), Some(28));
    }
}
