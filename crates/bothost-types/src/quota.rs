//! Per-user quota.
//!
//! Storage and execution are separate dimensions: `upload_limit` caps how many
//! bots a user may keep, `run_limit` caps how many may run at once. Both start
//! from the same configured default but are changed independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserQuota {
    pub user_id: UserId,
    /// Maximum number of stored bots.
    pub upload_limit: u32,
    /// Maximum number of concurrently running bots.
    pub run_limit: u32,
}

impl UserQuota {
    pub fn new(user_id: UserId, upload_limit: u32, run_limit: u32) -> Self {
        Self {
            user_id,
            upload_limit,
            run_limit,
        }
    }

    /// Quota applied to users without an explicit row.
    pub fn with_default(user_id: UserId, default_slots: u32) -> Self {
        Self::new(user_id, default_slots, default_slots)
    }
}

/// Administrative change to a user's quota. Unset fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaUpdate {
    pub upload_limit: Option<u32>,
    pub run_limit: Option<u32>,
}

impl QuotaUpdate {
    pub fn apply(&self, mut quota: UserQuota) -> UserQuota {
        if let Some(limit) = self.upload_limit {
            quota.upload_limit = limit;
        }
        if let Some(limit) = self.run_limit {
            quota.run_limit = limit;
        }
        quota
    }
}

/// Stored quota row with its modification time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredQuota {
    pub quota: UserQuota,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quota_uses_same_value_for_both() {
        let q = UserQuota::with_default(UserId(5), 3);
        assert_eq!(q.upload_limit, 3);
        assert_eq!(q.run_limit, 3);
    }

    #[test]
    fn test_update_changes_only_set_dimension() {
        let q = UserQuota::with_default(UserId(5), 3);
        let updated = QuotaUpdate {
            upload_limit: None,
            run_limit: Some(1),
        }
        .apply(q);
        assert_eq!(updated.upload_limit, 3);
        assert_eq!(updated.run_limit, 1);
    }
}
