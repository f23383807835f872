//! Global configuration types for the hosting service.
//!
//! `HostConfig` mirrors `config.toml` in the data directory. Every field has a
//! default so an empty or missing file yields a working setup.

use serde::{Deserialize, Serialize};

use std::time::Duration;

use crate::identity::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// User id with administrative rights. `0` disables administration.
    #[serde(default)]
    pub admin_id: i64,

    /// Default for both the upload and the run quota.
    #[serde(default = "default_slots")]
    pub default_slots: u32,

    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Accepted source file extensions, including the dot.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Program that runs a bot file. `None` executes the file itself.
    #[serde(default = "default_interpreter")]
    pub interpreter: Option<String>,

    /// Seconds a bot gets to exit after SIGTERM before it is killed.
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,

    /// Crash monitor polling period in seconds.
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,

    /// Telegram bot token for owner notifications.
    #[serde(default)]
    pub telegram_bot_token: Option<String>,

    /// Tell the administrator about every upload.
    #[serde(default = "default_true")]
    pub notify_admin_on_upload: bool,
}

fn default_slots() -> u32 {
    3
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    vec![".py".to_string()]
}

fn default_interpreter() -> Option<String> {
    Some("python3".to_string())
}

fn default_stop_grace_secs() -> u64 {
    5
}

fn default_monitor_interval_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            admin_id: 0,
            default_slots: default_slots(),
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
            interpreter: default_interpreter(),
            stop_grace_secs: default_stop_grace_secs(),
            monitor_interval_secs: default_monitor_interval_secs(),
            telegram_bot_token: None,
            notify_admin_on_upload: true,
        }
    }
}

impl HostConfig {
    pub fn admin(&self) -> Option<UserId> {
        (self.admin_id != 0).then_some(UserId(self.admin_id))
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    pub fn monitor_interval(&self) -> Duration {
        // A zero period would spin the monitor.
        Duration::from_secs(self.monitor_interval_secs.max(1))
    }

    pub fn is_allowed_file(&self, name: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|ext| name.to_lowercase().ends_with(&ext.to_lowercase()))
    }
}
