//! Bot hosting service.
//!
//! The caller-facing surface consumed by the REST API and CLI: upload, edit,
//! download and delete bot sources, drive their lifecycle, and report
//! per-user and host-wide status. Every operation checks ownership first.

use std::collections::BTreeSet;
use std::sync::Arc;

use bothost_types::activity::{ActivityEntry, AuditAction};
use bothost_types::bot::{BotStatus, HostStats, ProcessInfo, UploadRecord, UserStatus};
use bothost_types::config::HostConfig;
use bothost_types::error::SupervisorError;
use bothost_types::identity::{BotIdentity, Caller, UserId, sanitize_bot_name};
use bothost_types::quota::{QuotaUpdate, StoredQuota, UserQuota};
use chrono::Utc;

use crate::ports::{HostPorts, PortSet};
use crate::repository::activity::ActivityLog;
use crate::repository::quota::QuotaRepository;
use crate::repository::upload::UploadRepository;
use crate::service::store::BotStore;
use crate::supervisor::lifecycle::{
    BulkReport, LifecycleManager, StopOutcome, SupervisorSettings, authorize,
};

/// What happened after an edit was saved.
#[derive(Debug)]
pub enum EditOutcome {
    /// The bot was not running; only the source changed.
    Saved,
    /// The bot was running and came back up on the new source.
    Restarted(ProcessInfo),
    /// The new source is saved but the bot did not come back up.
    RestartFailed(SupervisorError),
}

pub struct BotService<P: HostPorts> {
    lifecycle: Arc<LifecycleManager<P>>,
    uploads: Arc<P::Uploads>,
    quotas: Arc<P::Quotas>,
    activity: Arc<P::Activity>,
    store: Arc<P::Store>,
    config: HostConfig,
}

fn require_admin(caller: &Caller) -> Result<(), SupervisorError> {
    if caller.is_admin {
        Ok(())
    } else {
        Err(SupervisorError::AccessDenied)
    }
}

fn require_self_or_admin(caller: &Caller, user: UserId) -> Result<(), SupervisorError> {
    if caller.is_admin || caller.user_id == user {
        Ok(())
    } else {
        Err(SupervisorError::AccessDenied)
    }
}

impl<P: HostPorts> BotService<P> {
    /// Wire the service and its supervisor from one configuration.
    pub fn new(ports: &PortSet<P>, config: HostConfig) -> Self {
        let lifecycle = LifecycleManager::new(ports, SupervisorSettings::from(&config));
        Self {
            lifecycle: Arc::new(lifecycle),
            uploads: Arc::clone(&ports.uploads),
            quotas: Arc::clone(&ports.quotas),
            activity: Arc::clone(&ports.activity),
            store: Arc::clone(&ports.store),
            config,
        }
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleManager<P>> {
        &self.lifecycle
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Sources
    // -----------------------------------------------------------------------

    /// Store a new bot for `owner`.
    ///
    /// The filename is sanitised into the bot name. Fails with `AlreadyExists`
    /// if the owner already has a bot of that name.
    pub async fn upload(
        &self,
        caller: &Caller,
        owner: UserId,
        filename: &str,
        content: &[u8],
    ) -> Result<UploadRecord, SupervisorError> {
        require_self_or_admin(caller, owner)?;

        let name = sanitize_bot_name(filename)
            .ok_or_else(|| SupervisorError::InvalidFile("file name is empty".to_string()))?;
        self.validate_file(&name, content)?;

        let identity = BotIdentity::new(owner, name);
        let guard = self.lifecycle.lock(&identity).await;
        if self.uploads.get_upload(&identity).await?.is_some() {
            return Err(SupervisorError::AlreadyExists(identity));
        }

        let admission = self.lifecycle.admission();
        let owner_guard = admission.lock_owner(owner).await;
        admission.check_upload(&owner_guard, owner).await?;

        self.store.save(&identity, content).await?;
        let record = UploadRecord {
            identity: identity.clone(),
            original_name: filename.to_string(),
            size: content.len() as u64,
            status: BotStatus::Stopped,
            uploaded_at: Utc::now(),
            last_started: None,
        };
        if let Err(e) = self.uploads.record_upload(&record).await {
            if let Err(cleanup) = self.store.remove(&identity).await {
                tracing::warn!(bot = %identity, error = %cleanup, "failed to remove orphaned source");
            }
            return Err(e.into());
        }
        drop(owner_guard);
        drop(guard);

        tracing::info!(owner = %owner, bot = %identity.name, size = record.size, "bot uploaded");
        let effects = self.lifecycle.effects();
        effects.audit(
            caller.user_id,
            AuditAction::BotUploaded,
            format!("Uploaded {} ({} bytes)", identity.name, record.size),
        );
        if self.config.notify_admin_on_upload {
            if let Some(admin) = self.config.admin().filter(|a| *a != caller.user_id) {
                effects.notify(admin, format!("📥 Upload: {} - {}", owner, filename));
            }
        }
        Ok(record)
    }

    /// Replace a bot's source, restarting it if it was running.
    ///
    /// The new source is never rolled back because a restart failed.
    pub async fn edit(
        &self,
        caller: &Caller,
        identity: &BotIdentity,
        content: &[u8],
    ) -> Result<EditOutcome, SupervisorError> {
        authorize(caller, identity)?;
        self.validate_file(&identity.name, content)?;

        let guard = self.lifecycle.lock(identity).await;
        if self.uploads.get_upload(identity).await?.is_none() {
            return Err(SupervisorError::NotFound);
        }
        self.store.save(identity, content).await?;
        if let Err(e) = self.uploads.set_size(identity, content.len() as u64).await {
            tracing::warn!(bot = %identity, error = %e, "failed to record new source size");
        }

        let outcome = if self.lifecycle.is_running(identity) {
            match self.lifecycle.restart_locked(&guard).await {
                Ok(info) => EditOutcome::Restarted(info),
                Err(e) => {
                    tracing::warn!(bot = %identity, error = %e, "restart after edit failed");
                    EditOutcome::RestartFailed(e)
                }
            }
        } else {
            EditOutcome::Saved
        };
        drop(guard);

        let effects = self.lifecycle.effects();
        effects.audit(
            caller.user_id,
            AuditAction::BotEdited,
            format!("Edited {}", identity.name),
        );
        if matches!(outcome, EditOutcome::Restarted(_)) {
            effects.audit(
                caller.user_id,
                AuditAction::BotRestarted,
                format!("Restarted {} after edit", identity.name),
            );
        }
        Ok(outcome)
    }

    /// Read a bot's source.
    pub async fn download(
        &self,
        caller: &Caller,
        identity: &BotIdentity,
    ) -> Result<(UploadRecord, Vec<u8>), SupervisorError> {
        authorize(caller, identity)?;
        let record = self
            .uploads
            .get_upload(identity)
            .await?
            .ok_or(SupervisorError::NotFound)?;
        let content = self.store.read(identity).await?;

        self.lifecycle.effects().audit(
            caller.user_id,
            AuditAction::BotDownloaded,
            format!("Downloaded {}", identity.name),
        );
        Ok((record, content))
    }

    /// Remove a bot entirely, stopping it first if it is live.
    pub async fn delete(
        &self,
        caller: &Caller,
        identity: &BotIdentity,
    ) -> Result<(), SupervisorError> {
        authorize(caller, identity)?;

        let guard = self.lifecycle.lock(identity).await;
        if self.uploads.get_upload(identity).await?.is_none() {
            return Err(SupervisorError::NotFound);
        }
        match self.lifecycle.stop_locked(&guard).await {
            Ok(_) | Err(SupervisorError::NotRunning(_)) => {}
            Err(e) => return Err(e),
        }
        self.store.remove(identity).await?;
        self.uploads.delete_upload(identity).await?;
        drop(guard);

        tracing::info!(owner = %identity.owner, bot = %identity.name, "bot deleted");
        self.lifecycle.effects().audit(
            caller.user_id,
            AuditAction::BotDeleted,
            format!("Deleted {}", identity.name),
        );
        Ok(())
    }

    fn validate_file(&self, name: &str, content: &[u8]) -> Result<(), SupervisorError> {
        if !self.config.is_allowed_file(name) {
            return Err(SupervisorError::InvalidFile(format!(
                "only {} files are allowed",
                self.config.allowed_extensions.join(", ")
            )));
        }
        if content.len() as u64 > self.config.max_file_size {
            return Err(SupervisorError::InvalidFile(format!(
                "file is {} bytes, limit is {}",
                content.len(),
                self.config.max_file_size
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub async fn start(
        &self,
        caller: &Caller,
        identity: &BotIdentity,
    ) -> Result<ProcessInfo, SupervisorError> {
        self.lifecycle.start(caller, identity).await
    }

    pub async fn stop(
        &self,
        caller: &Caller,
        identity: &BotIdentity,
    ) -> Result<StopOutcome, SupervisorError> {
        self.lifecycle.stop(caller, identity).await
    }

    pub async fn restart(
        &self,
        caller: &Caller,
        identity: &BotIdentity,
    ) -> Result<ProcessInfo, SupervisorError> {
        self.lifecycle.restart(caller, identity).await
    }

    pub async fn stop_all(&self, caller: &Caller) -> Result<BulkReport, SupervisorError> {
        self.lifecycle.stop_all(caller).await
    }

    pub async fn restart_all(&self, caller: &Caller) -> Result<BulkReport, SupervisorError> {
        self.lifecycle.restart_all(caller).await
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Stored bots of one user (or every user, for the admin with `None`).
    ///
    /// Statuses reflect the registry, not the possibly lagging stored value.
    pub async fn list(
        &self,
        caller: &Caller,
        owner: Option<UserId>,
    ) -> Result<Vec<UploadRecord>, SupervisorError> {
        let registry = self.lifecycle.registry();
        let mut records = self.stored(caller, owner).await?;
        for record in &mut records {
            record.status = match registry.info(&record.identity) {
                Some(info) => info.status,
                None if record.status.is_live() => BotStatus::Stopped,
                None => record.status,
            };
        }
        Ok(records)
    }

    /// Records exactly as persisted, without the registry overlay.
    ///
    /// For readers in another process than the supervisor, whose registry is
    /// always empty.
    pub async fn stored(
        &self,
        caller: &Caller,
        owner: Option<UserId>,
    ) -> Result<Vec<UploadRecord>, SupervisorError> {
        match owner {
            Some(user) => require_self_or_admin(caller, user)?,
            None => require_admin(caller)?,
        }
        Ok(self.uploads.list_uploads(owner).await?)
    }

    /// `{total, running, quota}` for one user.
    pub async fn status(&self, caller: &Caller, user: UserId) -> Result<UserStatus, SupervisorError> {
        require_self_or_admin(caller, user)?;
        Ok(UserStatus {
            total: self.uploads.count_uploads(user).await?,
            running: self.lifecycle.registry().count_owned_by(user),
            quota: self.lifecycle.admission().quota(user).await?,
        })
    }

    pub fn processes(&self, caller: &Caller) -> Vec<ProcessInfo> {
        self.lifecycle.processes(caller)
    }

    /// Host-wide counts. Admin only.
    pub async fn stats(&self, caller: &Caller) -> Result<HostStats, SupervisorError> {
        require_admin(caller)?;
        let uploads = self.uploads.list_uploads(None).await?;
        let quotas = self.quotas.list_quotas().await?;

        let users: BTreeSet<UserId> = uploads
            .iter()
            .map(|r| r.identity.owner)
            .chain(quotas.iter().map(|q| q.quota.user_id))
            .collect();

        Ok(HostStats {
            users: users.len() as u32,
            uploads: uploads.len() as u32,
            running: self.lifecycle.registry().len() as u32,
        })
    }

    /// Recent audit entries for one user, or for everyone (admin only).
    pub async fn activity(
        &self,
        caller: &Caller,
        user: Option<UserId>,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, SupervisorError> {
        match user {
            Some(u) => require_self_or_admin(caller, u)?,
            None => require_admin(caller)?,
        }
        Ok(self.activity.recent(user, limit).await?)
    }

    // -----------------------------------------------------------------------
    // Quotas
    // -----------------------------------------------------------------------

    pub async fn quota(&self, caller: &Caller, user: UserId) -> Result<UserQuota, SupervisorError> {
        require_self_or_admin(caller, user)?;
        self.lifecycle.admission().quota(user).await
    }

    /// Every explicitly configured quota. Admin only.
    pub async fn quotas(&self, caller: &Caller) -> Result<Vec<StoredQuota>, SupervisorError> {
        require_admin(caller)?;
        Ok(self.quotas.list_quotas().await?)
    }

    /// Change a user's limits. Admin only.
    ///
    /// Lowering a limit below current usage is allowed; it only blocks new
    /// uploads or starts until usage drops.
    pub async fn set_quota(
        &self,
        caller: &Caller,
        user: UserId,
        update: &QuotaUpdate,
    ) -> Result<UserQuota, SupervisorError> {
        require_admin(caller)?;

        let admission = self.lifecycle.admission();
        let _owner_guard = admission.lock_owner(user).await;
        let quota = update.apply(admission.quota(user).await?);
        self.quotas.set_quota(&quota).await?;

        tracing::info!(
            user = %user,
            upload_limit = quota.upload_limit,
            run_limit = quota.run_limit,
            "quota updated"
        );
        self.lifecycle.effects().audit(
            caller.user_id,
            AuditAction::QuotaChanged,
            format!(
                "User {}: upload_limit={}, run_limit={}",
                user, quota.upload_limit, quota.run_limit
            ),
        );
        Ok(quota)
    }
}
