//! Activity log trait definition.

use bothost_types::activity::ActivityEntry;
use bothost_types::error::RepositoryError;
use bothost_types::identity::UserId;

/// Append-only audit trail.
pub trait ActivityLog: Send + Sync + 'static {
    /// Append an entry.
    fn log(
        &self,
        entry: &ActivityEntry,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Most recent entries first, optionally for one user.
    fn recent(
        &self,
        user: Option<UserId>,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<ActivityEntry>, RepositoryError>> + Send;
}
