//! Upload repository trait definition.

use bothost_types::bot::{BotStatus, UploadRecord};
use bothost_types::error::RepositoryError;
use bothost_types::identity::{BotIdentity, UserId};
use chrono::{DateTime, Utc};

/// Persistence for upload records.
///
/// Records are a durable projection of the process registry: the supervisor
/// writes through after every committed transition.
pub trait UploadRepository: Send + Sync + 'static {
    /// Store a new record. Fails with `Conflict` if the identity exists.
    fn record_upload(
        &self,
        record: &UploadRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get the record for an identity.
    fn get_upload(
        &self,
        identity: &BotIdentity,
    ) -> impl std::future::Future<Output = Result<Option<UploadRecord>, RepositoryError>> + Send;

    /// List records, optionally restricted to one owner, ordered by upload time.
    fn list_uploads(
        &self,
        owner: Option<UserId>,
    ) -> impl std::future::Future<Output = Result<Vec<UploadRecord>, RepositoryError>> + Send;

    /// Count records owned by a user.
    fn count_uploads(
        &self,
        owner: UserId,
    ) -> impl std::future::Future<Output = Result<u32, RepositoryError>> + Send;

    /// Update the status. `last_started` is only overwritten when `Some`.
    fn set_status(
        &self,
        identity: &BotIdentity,
        status: BotStatus,
        last_started: Option<DateTime<Utc>>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Update the recorded source size after an edit.
    fn set_size(
        &self,
        identity: &BotIdentity,
        size: u64,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Remove a record. Fails with `NotFound` if absent.
    fn delete_upload(
        &self,
        identity: &BotIdentity,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List every record currently persisted with the given status.
    fn list_by_status(
        &self,
        status: BotStatus,
    ) -> impl std::future::Future<Output = Result<Vec<UploadRecord>, RepositoryError>> + Send;
}
