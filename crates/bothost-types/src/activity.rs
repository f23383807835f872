//! Audit trail entries for hosting activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::identity::UserId;

/// Kind of audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    BotUploaded,
    BotStarted,
    BotStopped,
    BotRestarted,
    BotEdited,
    BotDeleted,
    BotCrashed,
    BotDownloaded,
    QuotaChanged,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::BotUploaded => "bot_uploaded",
            AuditAction::BotStarted => "bot_started",
            AuditAction::BotStopped => "bot_stopped",
            AuditAction::BotRestarted => "bot_restarted",
            AuditAction::BotEdited => "bot_edited",
            AuditAction::BotDeleted => "bot_deleted",
            AuditAction::BotCrashed => "bot_crashed",
            AuditAction::BotDownloaded => "bot_downloaded",
            AuditAction::QuotaChanged => "quota_changed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bot_uploaded" => Ok(AuditAction::BotUploaded),
            "bot_started" => Ok(AuditAction::BotStarted),
            "bot_stopped" => Ok(AuditAction::BotStopped),
            "bot_restarted" => Ok(AuditAction::BotRestarted),
            "bot_edited" => Ok(AuditAction::BotEdited),
            "bot_deleted" => Ok(AuditAction::BotDeleted),
            "bot_crashed" => Ok(AuditAction::BotCrashed),
            "bot_downloaded" => Ok(AuditAction::BotDownloaded),
            "quota_changed" => Ok(AuditAction::QuotaChanged),
            other => Err(format!("invalid audit action: '{other}'")),
        }
    }
}

/// One row of the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    /// User the event is attributed to (the acting caller, or the owner for crashes).
    pub user_id: UserId,
    pub action: AuditAction,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(user_id: UserId, action: AuditAction, details: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            action,
            details: details.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_action_roundtrip() {
        for action in [
            AuditAction::BotUploaded,
            AuditAction::BotStarted,
            AuditAction::BotStopped,
            AuditAction::BotRestarted,
            AuditAction::BotEdited,
            AuditAction::BotDeleted,
            AuditAction::BotCrashed,
            AuditAction::BotDownloaded,
            AuditAction::QuotaChanged,
        ] {
            let parsed: AuditAction = action.to_string().parse().unwrap();
            assert_eq!(action, parsed);
        }
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&AuditAction::BotCrashed).unwrap();
        assert_eq!(json, "\"bot_crashed\"");
    }
}
