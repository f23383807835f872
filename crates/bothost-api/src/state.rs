//! Application state wiring the supervisor together.
//!
//! AppState holds the concrete service used by both CLI and REST API. The
//! service is generic over a `HostPorts` bundle; AppState pins it to the
//! SQLite/tokio adapters from `bothost-infra`.

use std::path::PathBuf;
use std::sync::Arc;

use bothost_core::service::bot::BotService;
use bothost_infra::config::load_host_config;
use bothost_infra::filesystem::{DataLayout, resolve_data_dir};
use bothost_infra::ports::{SqlitePorts, open_ports};
use bothost_types::config::HostConfig;
use bothost_types::identity::{Caller, UserId};

pub type HostService = BotService<SqlitePorts>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<HostService>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Resolve the data directory, load `config.toml` and open everything.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;
        let config = load_host_config(&data_dir).await;
        Self::open(data_dir, config).await
    }

    pub async fn open(data_dir: PathBuf, config: HostConfig) -> anyhow::Result<Self> {
        let layout = DataLayout::new(&data_dir);
        let ports = open_ports(&layout, &config).await?;

        let service = Arc::new(BotService::new(&ports, config));

        Ok(Self { service, data_dir })
    }

    pub fn config(&self) -> &HostConfig {
        self.service.config()
    }

    /// Resolve a user id against the configured administrator.
    pub fn caller(&self, user: UserId) -> Caller {
        match self.config().admin() {
            Some(admin) => Caller::resolve(user, admin),
            None => Caller::user(user),
        }
    }

    /// The operator at the local terminal. Has administrative rights.
    pub fn local_operator(&self) -> Caller {
        Caller::admin(self.config().admin().unwrap_or(UserId(0)))
    }
}
