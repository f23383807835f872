//! Detached side effects of lifecycle transitions: audit entries and notifications.
//!
//! Both run on their own tokio task. A transition's result never depends on
//! them; failures are logged and dropped.

use std::sync::Arc;

use bothost_types::activity::{ActivityEntry, AuditAction};
use bothost_types::identity::UserId;
use tokio::task::JoinHandle;

use crate::notify::Notifier;
use crate::repository::activity::ActivityLog;

pub struct Effects<A, N> {
    activity: Arc<A>,
    notifier: Arc<N>,
}

impl<A, N> Clone for Effects<A, N> {
    fn clone(&self) -> Self {
        Self {
            activity: Arc::clone(&self.activity),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<A: ActivityLog, N: Notifier> Effects<A, N> {
    pub fn new(activity: Arc<A>, notifier: Arc<N>) -> Self {
        Self { activity, notifier }
    }

    /// Record an audit entry. Mirrored as a `tracing` event on target `audit`.
    pub fn audit(
        &self,
        user: UserId,
        action: AuditAction,
        details: impl Into<String>,
    ) -> JoinHandle<()> {
        let entry = ActivityEntry::new(user, action, details);
        tracing::info!(
            target: "audit",
            user = %entry.user_id,
            action = %entry.action,
            details = %entry.details,
        );

        let activity = Arc::clone(&self.activity);
        tokio::spawn(async move {
            if let Err(e) = activity.log(&entry).await {
                tracing::warn!(action = %entry.action, error = %e, "failed to write activity log");
            }
        })
    }

    /// Send a message to a user, best effort.
    pub fn notify(&self, user: UserId, text: impl Into<String>) -> JoinHandle<()> {
        let text = text.into();
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(user, &text).await {
                tracing::warn!(user = %user, error = %e, "notification not delivered");
            }
        })
    }
}
