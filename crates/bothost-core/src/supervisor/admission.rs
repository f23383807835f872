//! Admission controller: may this user store another bot, or run one more?
//!
//! Both answers are computed fresh on every call from persisted upload counts
//! and the live registry, so there is no counter to drift. The queries are
//! side-effect free; callers that act on the answer hold the owner's
//! [`AdmissionGuard`] across check and mutation so concurrent requests from
//! one user cannot both squeeze through the last slot.

use std::sync::Arc;

use bothost_types::error::{QuotaKind, SupervisorError};
use bothost_types::identity::UserId;
use bothost_types::quota::UserQuota;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::process::ProcessHandle;
use crate::repository::quota::QuotaRepository;
use crate::repository::upload::UploadRepository;
use crate::supervisor::registry::ProcessRegistry;

type OwnerLocks = DashMap<UserId, Arc<Mutex<()>>>;

/// Held while a user's quota is checked and consumed.
pub struct AdmissionGuard {
    owner: UserId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<OwnerLocks>,
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.owner, |_, slot| Arc::strong_count(slot) == 1);
    }
}

pub struct AdmissionController<U, Q> {
    uploads: Arc<U>,
    quotas: Arc<Q>,
    default_slots: u32,
    owner_locks: Arc<OwnerLocks>,
}

impl<U: UploadRepository, Q: QuotaRepository> AdmissionController<U, Q> {
    pub fn new(uploads: Arc<U>, quotas: Arc<Q>, default_slots: u32) -> Self {
        Self {
            uploads,
            quotas,
            default_slots,
            owner_locks: Arc::new(DashMap::new()),
        }
    }

    /// Serialize admission decisions for one user. Other users are unaffected.
    pub async fn lock_owner(&self, owner: UserId) -> AdmissionGuard {
        let slot = self
            .owner_locks
            .entry(owner)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        AdmissionGuard {
            owner,
            guard: Some(slot.lock_owned().await),
            locks: Arc::clone(&self.owner_locks),
        }
    }

    /// Number of users with an admission lock currently allocated.
    pub fn owner_locks(&self) -> usize {
        self.owner_locks.len()
    }

    /// Effective quota: the stored row, or the configured default.
    pub async fn quota(&self, user: UserId) -> Result<UserQuota, SupervisorError> {
        Ok(self
            .quotas
            .get_quota(user)
            .await?
            .unwrap_or_else(|| UserQuota::with_default(user, self.default_slots)))
    }

    /// `count(uploads owned by user) < upload_limit`.
    pub async fn can_upload(&self, user: UserId) -> Result<bool, SupervisorError> {
        Ok(self.upload_headroom(user).await?.is_ok())
    }

    /// `count(live entries owned by user) < run_limit`.
    pub async fn can_start<H: ProcessHandle>(
        &self,
        user: UserId,
        registry: &ProcessRegistry<H>,
    ) -> Result<bool, SupervisorError> {
        Ok(self.run_headroom(user, registry).await?.is_ok())
    }

    /// Like [`can_upload`](Self::can_upload) but fails with `QuotaExceeded`.
    pub async fn check_upload(
        &self,
        _guard: &AdmissionGuard,
        user: UserId,
    ) -> Result<(), SupervisorError> {
        self.upload_headroom(user).await?
    }

    /// Like [`can_start`](Self::can_start) but fails with `QuotaExceeded`.
    pub async fn check_start<H: ProcessHandle>(
        &self,
        _guard: &AdmissionGuard,
        user: UserId,
        registry: &ProcessRegistry<H>,
    ) -> Result<(), SupervisorError> {
        self.run_headroom(user, registry).await?
    }

    async fn upload_headroom(
        &self,
        user: UserId,
    ) -> Result<Result<(), SupervisorError>, SupervisorError> {
        let quota = self.quota(user).await?;
        let used = self.uploads.count_uploads(user).await?;
        Ok(within(QuotaKind::Upload, used, quota.upload_limit))
    }

    async fn run_headroom<H: ProcessHandle>(
        &self,
        user: UserId,
        registry: &ProcessRegistry<H>,
    ) -> Result<Result<(), SupervisorError>, SupervisorError> {
        let quota = self.quota(user).await?;
        let used = registry.count_owned_by(user);
        Ok(within(QuotaKind::Run, used, quota.run_limit))
    }
}

fn within(kind: QuotaKind, used: u32, limit: u32) -> Result<(), SupervisorError> {
    if used < limit {
        Ok(())
    } else {
        Err(SupervisorError::QuotaExceeded { kind, used, limit })
    }
}
