//! Host configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.bothost/` in production)
//! and deserializes it into [`HostConfig`]. Falls back to defaults when the
//! file is missing or malformed, then applies environment overrides.

use std::path::Path;

use bothost_types::config::HostConfig;

/// Load host configuration from `{data_dir}/config.toml`, then the environment.
pub async fn load_host_config(data_dir: &Path) -> HostConfig {
    let config = read_config_file(data_dir).await;
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

async fn read_config_file(data_dir: &Path) -> HostConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return HostConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return HostConfig::default();
        }
    };

    match toml::from_str::<HostConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            HostConfig::default()
        }
    }
}

/// Apply `BOTHOST_ADMIN_ID` and `BOT_TOKEN` on top of the file values.
pub fn apply_env_overrides(
    mut config: HostConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> HostConfig {
    if let Some(raw) = lookup("BOTHOST_ADMIN_ID") {
        match raw.trim().parse::<i64>() {
            Ok(id) => config.admin_id = id,
            Err(err) => tracing::warn!("Ignoring BOTHOST_ADMIN_ID={raw:?}: {err}"),
        }
    }
    if let Some(token) = lookup("BOT_TOKEN").filter(|t| !t.trim().is_empty()) {
        config.telegram_bot_token = Some(token);
    }
    config
}
