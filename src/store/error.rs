//! Error types for settings and counter store operations.

use std::fmt;

use thiserror::Error;

/// Coarse cause of a store failure, recorded so callers can decide on a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreDbErrorKind {
    /// `SQLite` reported `SQLITE_BUSY` or `SQLITE_LOCKED`.
    BusyOrLocked,
    /// No pooled connection was available (timed out or pool closed).
    Pool,
    Io,
    Other,
}

impl StoreDbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => Self::Pool,
            sqlx::Error::Io(_) => Self::Io,
            sqlx::Error::Database(db) => {
                // Extended result codes arrive as numbers: 5 = BUSY, 6 = LOCKED.
                let busy = matches!(db.code().as_deref(), Some("5" | "6" | "SQLITE_BUSY" | "SQLITE_LOCKED"));
                if busy || db.message().contains("database is locked") {
                    Self::BusyOrLocked
                } else {
                    Self::Other
                }
            }
            _ => Self::Other,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::BusyOrLocked => "busy",
            Self::Pool => "pool",
            Self::Io => "io",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for StoreDbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors that can occur while reading or writing settings and counters.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("store error ({kind}) on key '{key}': {message}")]
    Database {
        /// Setting or counter key involved in the failed operation.
        key: String,
        /// Typed classification of the failure.
        kind: StoreDbErrorKind,
        /// Human-readable database error text.
        message: String,
    },
}

impl StoreError {
    /// Wraps an sqlx error with the key that was being accessed.
    #[must_use]
    pub fn database(key: impl Into<String>, error: &sqlx::Error) -> Self {
        Self::Database {
            key: key.into(),
            kind: StoreDbErrorKind::from_sqlx(error),
            message: error.to_string(),
        }
    }

    /// Returns true when this error is a database busy/locked condition.
    #[must_use]
    pub fn is_busy_or_locked(&self) -> bool {
        match self {
            Self::Database { kind, .. } => *kind == StoreDbErrorKind::BusyOrLocked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_message_includes_key_and_kind() {
        let err = StoreError::database("force_sub", &sqlx::Error::PoolClosed);
        let msg = err.to_string();
        assert!(msg.contains("force_sub"), "Expected key in: {msg}");
        assert!(msg.contains("(pool)"), "Expected kind in: {msg}");
        assert!(!err.is_busy_or_locked());
    }

    #[test]
    fn test_pool_failures_share_one_kind() {
        assert_eq!(
            StoreDbErrorKind::from_sqlx(&sqlx::Error::PoolTimedOut),
            StoreDbErrorKind::Pool
        );
        assert_eq!(
            StoreDbErrorKind::from_sqlx(&sqlx::Error::PoolClosed),
            StoreDbErrorKind::Pool
        );
    }

    #[test]
    fn test_io_failure_is_not_busy() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = StoreError::database("stats", &sqlx::Error::Io(io));
        assert!(!err.is_busy_or_locked());
        assert!(err.to_string().contains("(io)"));
    }
}
