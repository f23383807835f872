use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::identity::BotIdentity;
use crate::quota::UserQuota;

/// Lifecycle states of a hosted bot.
///
/// ```text
/// Stopped --start--> Starting --spawned--> Running
/// Running --stop--> Stopping --terminated--> Stopped
/// Running --(exit)--> Crashed --reconciled--> Stopped
/// ```
///
/// Persisted records only ever hold `Running` or `Stopped`; the transient
/// states are visible in the live registry snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    Crashed,
}

impl BotStatus {
    /// Whether a process exists for a bot in this state.
    pub fn is_live(self) -> bool {
        matches!(self, BotStatus::Starting | BotStatus::Running | BotStatus::Stopping)
    }
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotStatus::Starting => write!(f, "starting"),
            BotStatus::Running => write!(f, "running"),
            BotStatus::Stopping => write!(f, "stopping"),
            BotStatus::Stopped => write!(f, "stopped"),
            BotStatus::Crashed => write!(f, "crashed"),
        }
    }
}

impl FromStr for BotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "starting" => Ok(BotStatus::Starting),
            "running" => Ok(BotStatus::Running),
            "stopping" => Ok(BotStatus::Stopping),
            "stopped" => Ok(BotStatus::Stopped),
            "crashed" => Ok(BotStatus::Crashed),
            other => Err(format!("invalid bot status: '{other}'")),
        }
    }
}

impl Default for BotStatus {
    fn default() -> Self {
        BotStatus::Stopped
    }
}

/// Persisted record of an uploaded bot.
///
/// A projection of registry truth kept for durability and listings; the
/// registry wins whenever the two disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub identity: BotIdentity,
    /// Filename as the user uploaded it, before sanitising.
    pub original_name: String,
    /// Size of the source in bytes.
    pub size: u64,
    pub status: BotStatus,
    pub uploaded_at: DateTime<Utc>,
    pub last_started: Option<DateTime<Utc>>,
}

/// Snapshot of one live registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub identity: BotIdentity,
    pub pid: Option<u32>,
    pub status: BotStatus,
    pub started_at: DateTime<Utc>,
}

/// Per-user summary returned by `status(user)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatus {
    /// Number of stored bots.
    pub total: u32,
    /// Number of bots with a live process.
    pub running: u32,
    pub quota: UserQuota,
}

impl UserStatus {
    pub fn upload_slots_free(&self) -> u32 {
        self.quota.upload_limit.saturating_sub(self.total)
    }

    pub fn run_slots_free(&self) -> u32 {
        self.quota.run_limit.saturating_sub(self.running)
    }
}

/// Host-wide counters for the administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostStats {
    /// Distinct users that own a bot or have a quota row.
    pub users: u32,
    pub uploads: u32,
    pub running: u32,
}
