//! In-memory fakes of every port, shared by the core test modules.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bothost_types::activity::ActivityEntry;
use bothost_types::bot::{BotStatus, UploadRecord};
use bothost_types::error::{NotifyError, RepositoryError, SpawnError, StoreError};
use bothost_types::identity::{BotIdentity, UserId};
use bothost_types::quota::{StoredQuota, UserQuota};
use chrono::{DateTime, Utc};

use crate::notify::Notifier;
use crate::ports::{HostPorts, PortSet};
use crate::process::{ProcessHandle, ProcessSpawner, ProcessState};
use crate::repository::activity::ActivityLog;
use crate::repository::quota::QuotaRepository;
use crate::repository::upload::UploadRepository;
use crate::service::store::BotStore;
use crate::supervisor::lifecycle::{LifecycleManager, SupervisorSettings};

// ---------------------------------------------------------------------------
// Process handle
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeProcess {
    exit: Option<i32>,
    ignore_term: bool,
    fail_kill: bool,
    terminated: bool,
    killed: bool,
}

/// A process that only exits when told to.
pub struct FakeHandle {
    pid: u32,
    state: Arc<Mutex<FakeProcess>>,
}

/// Remote control for a [`FakeHandle`].
#[derive(Clone)]
pub struct FakeControl {
    state: Arc<Mutex<FakeProcess>>,
}

impl FakeHandle {
    pub fn new(pid: u32) -> (Self, FakeControl) {
        let state = Arc::new(Mutex::new(FakeProcess::default()));
        (
            Self {
                pid,
                state: Arc::clone(&state),
            },
            FakeControl { state },
        )
    }
}

impl ProcessHandle for FakeHandle {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn poll(&mut self) -> std::io::Result<ProcessState> {
        let state = self.state.lock().unwrap();
        Ok(match state.exit {
            Some(code) => ProcessState::Exited(code),
            None => ProcessState::Running,
        })
    }

    fn terminate(&mut self) -> std::io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.terminated = true;
        if !state.ignore_term && state.exit.is_none() {
            state.exit = Some(-15);
        }
        Ok(())
    }

    fn kill(&mut self) -> std::io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_kill {
            return Err(std::io::Error::other("kill refused"));
        }
        state.killed = true;
        state.exit.get_or_insert(-9);
        Ok(())
    }
}

impl FakeControl {
    /// Make the process exit with `code`.
    pub fn exit(&self, code: i32) {
        self.state.lock().unwrap().exit = Some(code);
    }

    /// Keep running after SIGTERM.
    pub fn ignore_term(&self) {
        self.state.lock().unwrap().ignore_term = true;
    }

    /// Make SIGKILL fail too.
    pub fn fail_kill(&self) {
        self.state.lock().unwrap().fail_kill = true;
    }

    pub fn terminated(&self) -> bool {
        self.state.lock().unwrap().terminated
    }

    pub fn killed(&self) -> bool {
        self.state.lock().unwrap().killed
    }

    pub fn exited(&self) -> bool {
        self.state.lock().unwrap().exit.is_some()
    }
}

// ---------------------------------------------------------------------------
// Spawner
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeSpawner {
    next_pid: AtomicU32,
    spawned: Mutex<Vec<(PathBuf, FakeControl)>>,
    fail: AtomicBool,
    stubborn: AtomicBool,
}

impl FakeSpawner {
    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    /// Control of the most recent process spawned from `path`.
    pub fn control(&self, path: &Path) -> Option<FakeControl> {
        self.spawned
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c.clone())
    }

    /// Controls of every process ever spawned, oldest first.
    pub fn controls(&self) -> Vec<FakeControl> {
        self.spawned
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Live (not yet exited) processes.
    pub fn live_count(&self) -> usize {
        self.controls().iter().filter(|c| !c.exited()).count()
    }

    pub fn fail_spawns(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// New processes ignore SIGTERM.
    pub fn spawn_stubborn(&self, stubborn: bool) {
        self.stubborn.store(stubborn, Ordering::SeqCst);
    }
}

impl ProcessSpawner for FakeSpawner {
    type Handle = FakeHandle;

    fn spawn(&self, path: &Path) -> Result<FakeHandle, SpawnError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SpawnError::NotFound(path.display().to_string()));
        }
        let pid = 1000 + self.next_pid.fetch_add(1, Ordering::SeqCst);
        let (handle, control) = FakeHandle::new(pid);
        if self.stubborn.load(Ordering::SeqCst) {
            control.ignore_term();
        }
        self.spawned
            .lock()
            .unwrap()
            .push((path.to_path_buf(), control));
        Ok(handle)
    }
}

// ---------------------------------------------------------------------------
// Repositories + bot store
// ---------------------------------------------------------------------------

/// Uploads, quotas, activity and bot sources, all in memory.
#[derive(Default)]
pub struct MemoryStore {
    uploads: Mutex<BTreeMap<BotIdentity, UploadRecord>>,
    quotas: Mutex<HashMap<UserId, StoredQuota>>,
    activity: Mutex<Vec<ActivityEntry>>,
    files: Mutex<HashMap<BotIdentity, Vec<u8>>>,
    fail_status_writes: AtomicBool,
}

pub fn upload_record(owner: i64, name: &str) -> UploadRecord {
    UploadRecord {
        identity: BotIdentity::new(UserId(owner), name),
        original_name: name.to_string(),
        size: 0,
        status: BotStatus::Stopped,
        uploaded_at: Utc::now(),
        last_started: None,
    }
}

impl MemoryStore {
    pub fn insert_record(&self, record: UploadRecord) {
        self.uploads
            .lock()
            .unwrap()
            .insert(record.identity.clone(), record);
    }

    pub fn record(&self, identity: &BotIdentity) -> Option<UploadRecord> {
        self.uploads.lock().unwrap().get(identity).cloned()
    }

    pub fn status_of(&self, identity: &BotIdentity) -> Option<BotStatus> {
        self.record(identity).map(|r| r.status)
    }

    pub fn set_quota_now(&self, quota: UserQuota) {
        self.quotas.lock().unwrap().insert(
            quota.user_id,
            StoredQuota {
                quota,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.activity.lock().unwrap().clone()
    }

    pub fn file(&self, identity: &BotIdentity) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(identity).cloned()
    }

    pub fn fail_status_writes(&self, fail: bool) {
        self.fail_status_writes.store(fail, Ordering::SeqCst);
    }
}

impl UploadRepository for MemoryStore {
    async fn record_upload(&self, record: &UploadRecord) -> Result<(), RepositoryError> {
        let mut uploads = self.uploads.lock().unwrap();
        if uploads.contains_key(&record.identity) {
            return Err(RepositoryError::Conflict(record.identity.to_string()));
        }
        uploads.insert(record.identity.clone(), record.clone());
        Ok(())
    }

    async fn get_upload(
        &self,
        identity: &BotIdentity,
    ) -> Result<Option<UploadRecord>, RepositoryError> {
        Ok(self.record(identity))
    }

    async fn list_uploads(
        &self,
        owner: Option<UserId>,
    ) -> Result<Vec<UploadRecord>, RepositoryError> {
        let mut records: Vec<UploadRecord> = self
            .uploads
            .lock()
            .unwrap()
            .values()
            .filter(|r| owner.is_none_or(|o| r.identity.owner == o))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.uploaded_at);
        Ok(records)
    }

    async fn count_uploads(&self, owner: UserId) -> Result<u32, RepositoryError> {
        Ok(self
            .uploads
            .lock()
            .unwrap()
            .keys()
            .filter(|id| id.owner == owner)
            .count() as u32)
    }

    async fn set_status(
        &self,
        identity: &BotIdentity,
        status: BotStatus,
        last_started: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk full".into()));
        }
        let mut uploads = self.uploads.lock().unwrap();
        let record = uploads.get_mut(identity).ok_or(RepositoryError::NotFound)?;
        record.status = status;
        if last_started.is_some() {
            record.last_started = last_started;
        }
        Ok(())
    }

    async fn set_size(&self, identity: &BotIdentity, size: u64) -> Result<(), RepositoryError> {
        let mut uploads = self.uploads.lock().unwrap();
        let record = uploads.get_mut(identity).ok_or(RepositoryError::NotFound)?;
        record.size = size;
        Ok(())
    }

    async fn delete_upload(&self, identity: &BotIdentity) -> Result<(), RepositoryError> {
        self.uploads
            .lock()
            .unwrap()
            .remove(identity)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_by_status(
        &self,
        status: BotStatus,
    ) -> Result<Vec<UploadRecord>, RepositoryError> {
        Ok(self
            .uploads
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }
}

impl QuotaRepository for MemoryStore {
    async fn get_quota(&self, user: UserId) -> Result<Option<UserQuota>, RepositoryError> {
        Ok(self
            .quotas
            .lock()
            .unwrap()
            .get(&user)
            .map(|s| s.quota.clone()))
    }

    async fn set_quota(&self, quota: &UserQuota) -> Result<(), RepositoryError> {
        self.set_quota_now(quota.clone());
        Ok(())
    }

    async fn list_quotas(&self) -> Result<Vec<StoredQuota>, RepositoryError> {
        let mut rows: Vec<StoredQuota> = self.quotas.lock().unwrap().values().cloned().collect();
        rows.sort_by_key(|s| s.quota.user_id);
        Ok(rows)
    }
}

impl ActivityLog for MemoryStore {
    async fn log(&self, entry: &ActivityEntry) -> Result<(), RepositoryError> {
        self.activity.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn recent(
        &self,
        user: Option<UserId>,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, RepositoryError> {
        Ok(self
            .activity
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| user.is_none_or(|u| e.user_id == u))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

impl BotStore for MemoryStore {
    fn source_path(&self, identity: &BotIdentity) -> PathBuf {
        PathBuf::from("/bots").join(identity.file_stem())
    }

    async fn save(&self, identity: &BotIdentity, content: &[u8]) -> Result<(), StoreError> {
        self.files
            .lock()
            .unwrap()
            .insert(identity.clone(), content.to_vec());
        Ok(())
    }

    async fn read(&self, identity: &BotIdentity) -> Result<Vec<u8>, StoreError> {
        self.file(identity).ok_or(StoreError::NotFound)
    }

    async fn remove(&self, identity: &BotIdentity) -> Result<(), StoreError> {
        self.files.lock().unwrap().remove(identity);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(UserId, String)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(UserId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, user: UserId, text: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("offline".into()));
        }
        self.sent.lock().unwrap().push((user, text.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct FakePorts;

impl HostPorts for FakePorts {
    type Spawner = FakeSpawner;
    type Uploads = MemoryStore;
    type Quotas = MemoryStore;
    type Activity = MemoryStore;
    type Notifier = RecordingNotifier;
    type Store = MemoryStore;
}

/// Every fake, plus the `PortSet` that wires them.
pub struct Harness {
    pub spawner: Arc<FakeSpawner>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub ports: PortSet<FakePorts>,
}

impl Harness {
    pub fn new() -> Self {
        let spawner = Arc::new(FakeSpawner::default());
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let ports = PortSet {
            spawner: Arc::clone(&spawner),
            uploads: Arc::clone(&store),
            quotas: Arc::clone(&store),
            activity: Arc::clone(&store),
            notifier: Arc::clone(&notifier),
            store: Arc::clone(&store),
        };
        Self {
            spawner,
            store,
            notifier,
            ports,
        }
    }

    pub fn settings() -> SupervisorSettings {
        SupervisorSettings {
            default_slots: 3,
            stop_grace: Duration::from_millis(200),
        }
    }

    pub fn lifecycle(&self) -> Arc<LifecycleManager<FakePorts>> {
        Arc::new(LifecycleManager::new(&self.ports, Self::settings()))
    }

    /// Persist an upload record plus source for `owner/name`.
    pub fn seed(&self, owner: i64, name: &str) -> BotIdentity {
        let record = upload_record(owner, name);
        let identity = record.identity.clone();
        self.store.insert_record(record);
        self.store
            .files
            .lock()
            .unwrap()
            .insert(identity.clone(), b"print('hi')".to_vec());
        identity
    }

    pub fn control(&self, identity: &BotIdentity) -> FakeControl {
        self.spawner
            .control(&self.store.source_path(identity))
            .expect("bot was never spawned")
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
