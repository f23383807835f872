//! Production wiring of the supervisor ports.

use std::sync::Arc;

use bothost_core::ports::{HostPorts, PortSet};
use bothost_types::config::HostConfig;
use thiserror::Error;

use crate::filesystem::{DataLayout, LocalBotStore};
use crate::notify::HostNotifier;
use crate::process::CommandSpawner;
use crate::sqlite::activity::SqliteActivityLog;
use crate::sqlite::pool::{DatabasePool, database_url};
use crate::sqlite::quota::SqliteQuotaRepository;
use crate::sqlite::upload::SqliteUploadRepository;

/// SQLite storage, local files, child processes and Telegram.
pub struct SqlitePorts;

impl HostPorts for SqlitePorts {
    type Spawner = CommandSpawner;
    type Uploads = SqliteUploadRepository;
    type Quotas = SqliteQuotaRepository;
    type Activity = SqliteActivityLog;
    type Notifier = HostNotifier;
    type Store = LocalBotStore;
}

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("failed to prepare data directory: {0}")]
    DataDir(#[from] std::io::Error),

    #[error("failed to open database: {0}")]
    Database(#[from] sqlx::Error),
}

/// Open the database and build every adapter for `layout`.
pub async fn open_ports(
    layout: &DataLayout,
    config: &HostConfig,
) -> Result<PortSet<SqlitePorts>, WiringError> {
    layout.ensure().await?;
    let pool = DatabasePool::new(&database_url(layout.root())).await?;

    let notifier = HostNotifier::from_token(config.telegram_bot_token.as_deref());
    tracing::debug!(notifier = ?notifier, data_dir = %layout.root().display(), "ports ready");

    Ok(PortSet {
        spawner: Arc::new(CommandSpawner::new(
            config.interpreter.clone(),
            layout.bots_dir(),
            layout.logs_dir(),
        )),
        uploads: Arc::new(SqliteUploadRepository::new(pool.clone())),
        quotas: Arc::new(SqliteQuotaRepository::new(pool.clone())),
        activity: Arc::new(SqliteActivityLog::new(pool)),
        notifier: Arc::new(notifier),
        store: Arc::new(LocalBotStore::new(layout.bots_dir())),
    })
}
