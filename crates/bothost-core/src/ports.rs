//! Bundle of every port the supervisor is wired against.
//!
//! Services take one `P: HostPorts` parameter instead of six independent
//! generics. The API crate pins it to the SQLite/tokio adapters; tests pin it
//! to in-memory fakes.

use std::sync::Arc;

use crate::notify::Notifier;
use crate::process::ProcessSpawner;
use crate::repository::activity::ActivityLog;
use crate::repository::quota::QuotaRepository;
use crate::repository::upload::UploadRepository;
use crate::service::store::BotStore;

pub trait HostPorts: Send + Sync + 'static {
    type Spawner: ProcessSpawner;
    type Uploads: UploadRepository;
    type Quotas: QuotaRepository;
    type Activity: ActivityLog;
    type Notifier: Notifier;
    type Store: BotStore;
}

/// Concrete adapter instances for one `HostPorts` wiring.
pub struct PortSet<P: HostPorts> {
    pub spawner: Arc<P::Spawner>,
    pub uploads: Arc<P::Uploads>,
    pub quotas: Arc<P::Quotas>,
    pub activity: Arc<P::Activity>,
    pub notifier: Arc<P::Notifier>,
    pub store: Arc<P::Store>,
}

impl<P: HostPorts> Clone for PortSet<P> {
    fn clone(&self) -> Self {
        Self {
            spawner: Arc::clone(&self.spawner),
            uploads: Arc::clone(&self.uploads),
            quotas: Arc::clone(&self.quotas),
            activity: Arc::clone(&self.activity),
            notifier: Arc::clone(&self.notifier),
            store: Arc::clone(&self.store),
        }
    }
}
