//! Notifier port: best-effort message delivery to a user.

use bothost_types::error::NotifyError;
use bothost_types::identity::UserId;

/// Delivers short text messages to a user.
///
/// Callers never propagate a `NotifyError`; delivery runs detached from the
/// transition that triggered it.
pub trait Notifier: Send + Sync + 'static {
    fn notify(
        &self,
        user: UserId,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}
