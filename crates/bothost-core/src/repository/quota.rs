//! Quota repository trait definition.

use bothost_types::error::RepositoryError;
use bothost_types::identity::UserId;
use bothost_types::quota::{StoredQuota, UserQuota};

/// Persistence for per-user quotas.
///
/// Users without a row fall back to the configured default; that decision is
/// made by the admission controller, not here.
pub trait QuotaRepository: Send + Sync + 'static {
    /// Get the explicit quota row for a user, if any.
    fn get_quota(
        &self,
        user: UserId,
    ) -> impl std::future::Future<Output = Result<Option<UserQuota>, RepositoryError>> + Send;

    /// Insert or replace a user's quota.
    fn set_quota(
        &self,
        quota: &UserQuota,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List every explicit quota row.
    fn list_quotas(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<StoredQuota>, RepositoryError>> + Send;
}
