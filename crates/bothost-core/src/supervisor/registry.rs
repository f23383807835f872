//! Process registry: the in-memory source of truth for "is this bot live".
//!
//! Entries live in a `DashMap` keyed by identity. Every mutation (insert,
//! status change, removal) requires an [`IdentityGuard`], so all transitions
//! for one identity are serialized while different identities proceed
//! independently. Handles sit behind a short-lived `std::sync::Mutex` that is
//! never held across `.await`.

use std::sync::{Arc, Mutex as StdMutex};

use bothost_types::bot::{BotStatus, ProcessInfo};
use bothost_types::identity::{BotIdentity, UserId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::process::{ProcessHandle, ProcessState};

/// A live process owned exclusively by the registry.
pub struct BotProcessEntry<H> {
    pub identity: BotIdentity,
    pub started_at: DateTime<Utc>,
    pub status: BotStatus,
    pid: Option<u32>,
    handle: StdMutex<H>,
}

impl<H: ProcessHandle> BotProcessEntry<H> {
    fn new(identity: BotIdentity, handle: H, started_at: DateTime<Utc>) -> Self {
        Self {
            pid: handle.pid(),
            identity,
            started_at,
            status: BotStatus::Running,
            handle: StdMutex::new(handle),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn info(&self) -> ProcessInfo {
        ProcessInfo {
            identity: self.identity.clone(),
            pid: self.pid,
            status: self.status,
            started_at: self.started_at,
        }
    }

    /// Take the handle back, e.g. to keep polling after removal.
    pub fn into_handle(self) -> H {
        self.handle
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

type LockSlots = DashMap<BotIdentity, Arc<Mutex<()>>>;

/// Proof that the caller holds the transition lock for one identity.
///
/// Dropping the guard releases the lock and discards the identity's slot
/// once nobody else holds or waits on it, so the slot map only tracks
/// identities with transitions in flight.
pub struct IdentityGuard {
    identity: BotIdentity,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Arc<LockSlots>,
}

impl IdentityGuard {
    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }
}

impl Drop for IdentityGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold a clone of the slot, so an idle slot has only the map's reference.
        self.slots
            .remove_if(&self.identity, |_, slot| Arc::strong_count(slot) == 1);
    }
}

impl std::fmt::Debug for IdentityGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityGuard")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Concurrency-safe map from identity to live process.
pub struct ProcessRegistry<H> {
    entries: DashMap<BotIdentity, BotProcessEntry<H>>,
    locks: Arc<LockSlots>,
}

impl<H: ProcessHandle> ProcessRegistry<H> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            locks: Arc::new(DashMap::new()),
        }
    }

    fn lock_slot(&self, identity: &BotIdentity) -> Arc<Mutex<()>> {
        // Clone out of the map so no shard guard is held while waiting.
        self.locks
            .entry(identity.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Wait for exclusive transition rights on an identity.
    pub async fn lock(&self, identity: &BotIdentity) -> IdentityGuard {
        let slot = self.lock_slot(identity);
        let guard = slot.lock_owned().await;
        self.guard_for(identity, guard)
    }

    /// Take transition rights only if nobody else holds them right now.
    pub fn try_lock(&self, identity: &BotIdentity) -> Option<IdentityGuard> {
        let slot = self.lock_slot(identity);
        let guard = slot.try_lock_owned().ok()?;
        Some(self.guard_for(identity, guard))
    }

    fn guard_for(&self, identity: &BotIdentity, guard: OwnedMutexGuard<()>) -> IdentityGuard {
        IdentityGuard {
            identity: identity.clone(),
            guard: Some(guard),
            slots: Arc::clone(&self.locks),
        }
    }

    /// Number of identities with a transition lock currently allocated.
    pub fn lock_slots(&self) -> usize {
        self.locks.len()
    }

    pub fn contains(&self, identity: &BotIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    /// Register a freshly spawned process.
    ///
    /// Returns the handle back if an entry already exists; callers check
    /// [`contains`](Self::contains) under the same guard first, so this only
    /// fires on a logic error.
    pub fn insert(
        &self,
        guard: &IdentityGuard,
        handle: H,
        started_at: DateTime<Utc>,
    ) -> Result<ProcessInfo, H> {
        match self.entries.entry(guard.identity.clone()) {
            Entry::Occupied(_) => Err(handle),
            Entry::Vacant(slot) => {
                let entry = BotProcessEntry::new(guard.identity.clone(), handle, started_at);
                let info = entry.info();
                slot.insert(entry);
                Ok(info)
            }
        }
    }

    /// Update the status of a live entry. Returns `false` if absent.
    pub fn set_status(&self, guard: &IdentityGuard, status: BotStatus) -> bool {
        match self.entries.get_mut(&guard.identity) {
            Some(mut entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    /// Remove the entry. Removing an absent identity is a silent no-op.
    pub fn remove(&self, guard: &IdentityGuard) -> Option<BotProcessEntry<H>> {
        self.entries.remove(&guard.identity).map(|(_, entry)| entry)
    }

    /// Run `f` against the handle of a live entry.
    pub fn with_handle<R>(&self, identity: &BotIdentity, f: impl FnOnce(&mut H) -> R) -> Option<R> {
        let entry = self.entries.get(identity)?;
        let mut handle = entry
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(f(&mut *handle))
    }

    /// Non-blocking exit check. `None` if the identity is not registered.
    pub fn poll(&self, identity: &BotIdentity) -> Option<std::io::Result<ProcessState>> {
        self.with_handle(identity, |h| h.poll())
    }

    pub fn info(&self, identity: &BotIdentity) -> Option<ProcessInfo> {
        self.entries.get(identity).map(|e| e.info())
    }

    /// Number of live entries owned by a user.
    pub fn count_owned_by(&self, owner: UserId) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.key().owner == owner)
            .count() as u32
    }

    /// Snapshot of registered identities.
    pub fn identities(&self) -> Vec<BotIdentity> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Snapshot of every live entry, sorted by identity.
    pub fn snapshot(&self) -> Vec<ProcessInfo> {
        let mut infos: Vec<ProcessInfo> = self.entries.iter().map(|e| e.info()).collect();
        infos.sort_by(|a, b| a.identity.cmp(&b.identity));
        infos
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H: ProcessHandle> Default for ProcessRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
