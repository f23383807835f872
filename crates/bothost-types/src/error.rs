use thiserror::Error;

use crate::identity::BotIdentity;

/// Errors returned by supervisor operations to their immediate caller.
///
/// None of these are retried by the supervisor; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("bot '{0}' is already running")]
    AlreadyRunning(BotIdentity),

    #[error("bot '{0}' is not running")]
    NotRunning(BotIdentity),

    #[error("quota exceeded: {used}/{limit} {kind}")]
    QuotaExceeded {
        kind: QuotaKind,
        used: u32,
        limit: u32,
    },

    #[error("access denied")]
    AccessDenied,

    #[error("failed to start bot: {0}")]
    Spawn(#[from] SpawnError),

    #[error("bot not found")]
    NotFound,

    #[error("bot '{0}' already exists")]
    AlreadyExists(BotIdentity),

    #[error("invalid file: {0}")]
    InvalidFile(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Which quota dimension was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    Upload,
    Run,
}

impl std::fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaKind::Upload => write!(f, "stored bots"),
            QuotaKind::Run => write!(f, "running bots"),
        }
    }
}

/// Failure to create a child process.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("executable not found: {0}")]
    NotFound(String),

    #[error("spawn failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from repository operations (used by trait definitions in bothost-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the bot source store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("source file not found")]
    NotFound,

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

/// Notification delivery failure. Always swallowed by the supervisor.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifier not configured")]
    NotConfigured,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl From<RepositoryError> for SupervisorError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => SupervisorError::NotFound,
            other => SupervisorError::Storage(other.to_string()),
        }
    }
}

impl From<StoreError> for SupervisorError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => SupervisorError::NotFound,
            StoreError::Io(io) => SupervisorError::Storage(io.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserId;

    #[test]
    fn test_supervisor_error_display() {
        let err = SupervisorError::AlreadyRunning(BotIdentity::new(UserId(1), "a.py"));
        assert_eq!(err.to_string(), "bot '1/a.py' is already running");
    }

    #[test]
    fn test_quota_error_display() {
        let err = SupervisorError::QuotaExceeded {
            kind: QuotaKind::Run,
            used: 3,
            limit: 3,
        };
        assert_eq!(err.to_string(), "quota exceeded: 3/3 running bots");
    }

    #[test]
    fn test_repository_not_found_maps_to_not_found() {
        let err: SupervisorError = RepositoryError::NotFound.into();
        assert!(matches!(err, SupervisorError::NotFound));

        let err: SupervisorError = RepositoryError::Query("boom".into()).into();
        assert!(matches!(err, SupervisorError::Storage(_)));
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }
}
