//! Lifecycle manager: start, stop and restart bots under per-identity locks.
//!
//! Every transition follows the same order:
//!
//! 1. ownership check (no state touched on failure)
//! 2. acquire the identity lock
//! 3. mutate the registry
//! 4. write the new status through to storage, still under the lock
//! 5. release, then fire audit/notify side effects detached
//!
//! Step 4 after step 3 means storage can lag the registry but never lead it.

use std::sync::Arc;
use std::time::Duration;

use bothost_types::activity::AuditAction;
use bothost_types::bot::{BotStatus, ProcessInfo};
use bothost_types::config::HostConfig;
use bothost_types::error::SupervisorError;
use bothost_types::identity::{BotIdentity, Caller, UserId};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::time::Instant;

use crate::ports::{HostPorts, PortSet};
use crate::process::{ProcessHandle, ProcessSpawner, ProcessState};
use crate::repository::upload::UploadRepository;
use crate::service::store::BotStore;
use crate::supervisor::admission::AdmissionController;
use crate::supervisor::effects::Effects;
use crate::supervisor::monitor::CrashMonitor;
use crate::supervisor::registry::{IdentityGuard, ProcessRegistry};

/// Interval between exit polls while waiting on a terminating process.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for the OS to reap a process after SIGKILL.
const REAP_WAIT: Duration = Duration::from_secs(1);

pub type HandleOf<P> = <<P as HostPorts>::Spawner as ProcessSpawner>::Handle;

/// The crash monitor type that matches a `HostPorts` wiring.
pub type MonitorOf<P> = CrashMonitor<
    HandleOf<P>,
    <P as HostPorts>::Uploads,
    <P as HostPorts>::Activity,
    <P as HostPorts>::Notifier,
>;

/// Tunables of the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub default_slots: u32,
    pub stop_grace: Duration,
}

impl From<&HostConfig> for SupervisorSettings {
    fn from(config: &HostConfig) -> Self {
        Self {
            default_slots: config.default_slots,
            stop_grace: config.stop_grace(),
        }
    }
}

/// How a stop concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOutcome {
    /// Exit code, if the process was observed to exit.
    pub exit_code: Option<i32>,
    /// Whether the grace period ran out and SIGKILL was sent.
    pub forced: bool,
}

/// Result of a bulk operation. Per-bot failures never abort the batch.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub succeeded: Vec<BotIdentity>,
    pub failed: Vec<(BotIdentity, SupervisorError)>,
}

pub struct LifecycleManager<P: HostPorts> {
    registry: Arc<ProcessRegistry<HandleOf<P>>>,
    admission: AdmissionController<P::Uploads, P::Quotas>,
    spawner: Arc<P::Spawner>,
    uploads: Arc<P::Uploads>,
    store: Arc<P::Store>,
    effects: Effects<P::Activity, P::Notifier>,
    stop_grace: Duration,
}

pub(crate) fn authorize(caller: &Caller, identity: &BotIdentity) -> Result<(), SupervisorError> {
    if caller.may_access(identity) {
        Ok(())
    } else {
        Err(SupervisorError::AccessDenied)
    }
}

impl<P: HostPorts> LifecycleManager<P> {
    pub fn new(ports: &PortSet<P>, settings: SupervisorSettings) -> Self {
        Self {
            registry: Arc::new(ProcessRegistry::new()),
            admission: AdmissionController::new(
                Arc::clone(&ports.uploads),
                Arc::clone(&ports.quotas),
                settings.default_slots,
            ),
            spawner: Arc::clone(&ports.spawner),
            uploads: Arc::clone(&ports.uploads),
            store: Arc::clone(&ports.store),
            effects: Effects::new(Arc::clone(&ports.activity), Arc::clone(&ports.notifier)),
            stop_grace: settings.stop_grace,
        }
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry<HandleOf<P>>> {
        &self.registry
    }

    pub fn admission(&self) -> &AdmissionController<P::Uploads, P::Quotas> {
        &self.admission
    }

    pub fn effects(&self) -> &Effects<P::Activity, P::Notifier> {
        &self.effects
    }

    /// A crash monitor bound to this manager's registry.
    pub fn crash_monitor(&self, period: Duration) -> MonitorOf<P> {
        CrashMonitor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.uploads),
            self.effects.clone(),
            period,
        )
    }

    pub fn is_running(&self, identity: &BotIdentity) -> bool {
        self.registry.contains(identity)
    }

    // -----------------------------------------------------------------------
    // Caller-facing transitions
    // -----------------------------------------------------------------------

    /// Start a stored bot.
    pub async fn start(
        &self,
        caller: &Caller,
        identity: &BotIdentity,
    ) -> Result<ProcessInfo, SupervisorError> {
        authorize(caller, identity)?;
        let guard = self.lock(identity).await;
        let info = self.start_locked(&guard).await?;
        drop(guard);

        self.effects.audit(
            caller.user_id,
            AuditAction::BotStarted,
            format!("Started {}", identity.name),
        );
        Ok(info)
    }

    /// Stop a live bot: SIGTERM, wait out the grace period, then SIGKILL.
    pub async fn stop(
        &self,
        caller: &Caller,
        identity: &BotIdentity,
    ) -> Result<StopOutcome, SupervisorError> {
        authorize(caller, identity)?;
        let guard = self.lock(identity).await;
        let outcome = self.stop_locked(&guard).await?;
        drop(guard);

        self.effects.audit(
            caller.user_id,
            AuditAction::BotStopped,
            format!("Stopped {}", identity.name),
        );
        Ok(outcome)
    }

    /// Stop then start, holding the identity lock across both halves.
    ///
    /// A failed start leaves the bot stopped and surfaces the error.
    pub async fn restart(
        &self,
        caller: &Caller,
        identity: &BotIdentity,
    ) -> Result<ProcessInfo, SupervisorError> {
        authorize(caller, identity)?;
        let guard = self.lock(identity).await;
        let info = self.restart_locked(&guard).await?;
        drop(guard);

        self.effects.audit(
            caller.user_id,
            AuditAction::BotRestarted,
            format!("Restarted {}", identity.name),
        );
        Ok(info)
    }

    /// Stop every live bot. Admin only.
    pub async fn stop_all(&self, caller: &Caller) -> Result<BulkReport, SupervisorError> {
        if !caller.is_admin {
            return Err(SupervisorError::AccessDenied);
        }
        Ok(self.stop_every_live_bot(caller).await)
    }

    /// Restart every live bot. Admin only.
    pub async fn restart_all(&self, caller: &Caller) -> Result<BulkReport, SupervisorError> {
        if !caller.is_admin {
            return Err(SupervisorError::AccessDenied);
        }

        let results = join_all(self.registry.identities().into_iter().map(|identity| async move {
            let result = self.restart(caller, &identity).await;
            (identity, result)
        }))
        .await;

        Ok(collect_report(results))
    }

    /// Stop everything before the host exits.
    pub async fn shutdown(&self) {
        let live = self.registry.len();
        if live == 0 {
            return;
        }
        tracing::info!(live, "stopping all bots before shutdown");
        let report = self.stop_every_live_bot(&Caller::admin(UserId(0))).await;
        for (identity, err) in &report.failed {
            tracing::warn!(bot = %identity, error = %err, "bot did not stop cleanly");
        }
    }

    /// Live processes visible to the caller.
    pub fn processes(&self, caller: &Caller) -> Vec<ProcessInfo> {
        self.registry
            .snapshot()
            .into_iter()
            .filter(|info| caller.may_access(&info.identity))
            .collect()
    }

    async fn stop_every_live_bot(&self, caller: &Caller) -> BulkReport {
        let results = join_all(self.registry.identities().into_iter().map(|identity| async move {
            let result = self.stop(caller, &identity).await;
            (identity, result)
        }))
        .await;

        collect_report(results)
    }

    // -----------------------------------------------------------------------
    // Locked building blocks, shared with the bot service
    // -----------------------------------------------------------------------

    pub(crate) async fn lock(&self, identity: &BotIdentity) -> IdentityGuard {
        self.registry.lock(identity).await
    }

    pub(crate) async fn start_locked(
        &self,
        guard: &IdentityGuard,
    ) -> Result<ProcessInfo, SupervisorError> {
        let identity = guard.identity();
        if self.registry.contains(identity) {
            return Err(SupervisorError::AlreadyRunning(identity.clone()));
        }
        if self.uploads.get_upload(identity).await?.is_none() {
            return Err(SupervisorError::NotFound);
        }

        let owner_guard = self.admission.lock_owner(identity.owner).await;
        self.admission
            .check_start(&owner_guard, identity.owner, self.registry.as_ref())
            .await?;

        let path = self.store.source_path(identity);
        let handle = self.spawner.spawn(&path).map_err(|e| {
            tracing::warn!(owner = %identity.owner, bot = %identity.name, error = %e, "spawn failed");
            e
        })?;

        let started_at = Utc::now();
        let info = match self.registry.insert(guard, handle, started_at) {
            Ok(info) => info,
            Err(mut orphan) => {
                // Unreachable while the guard is held; never leave the child behind.
                let _ = orphan.kill();
                return Err(SupervisorError::AlreadyRunning(identity.clone()));
            }
        };
        drop(owner_guard);

        self.write_status(identity, BotStatus::Running, Some(started_at))
            .await;
        tracing::info!(
            owner = %identity.owner,
            bot = %identity.name,
            pid = ?info.pid,
            "bot started"
        );
        Ok(info)
    }

    pub(crate) async fn stop_locked(
        &self,
        guard: &IdentityGuard,
    ) -> Result<StopOutcome, SupervisorError> {
        let identity = guard.identity();
        if !self.registry.set_status(guard, BotStatus::Stopping) {
            return Err(SupervisorError::NotRunning(identity.clone()));
        }

        let outcome = self.terminate(identity).await;
        self.registry.remove(guard);
        self.write_status(identity, BotStatus::Stopped, None).await;

        tracing::info!(
            owner = %identity.owner,
            bot = %identity.name,
            exit_code = ?outcome.exit_code,
            forced = outcome.forced,
            "bot stopped"
        );
        Ok(outcome)
    }

    pub(crate) async fn restart_locked(
        &self,
        guard: &IdentityGuard,
    ) -> Result<ProcessInfo, SupervisorError> {
        self.stop_locked(guard).await?;
        self.start_locked(guard).await
    }

    /// SIGTERM, bounded wait, SIGKILL, brief reap. Always returns.
    async fn terminate(&self, identity: &BotIdentity) -> StopOutcome {
        match self.registry.with_handle(identity, |h| h.terminate()) {
            Some(Ok(())) => {
                if let Some(code) = self.wait_for_exit(identity, self.stop_grace).await {
                    return StopOutcome {
                        exit_code: Some(code),
                        forced: false,
                    };
                }
            }
            Some(Err(e)) => {
                tracing::warn!(bot = %identity, error = %e, "terminate failed, escalating to kill");
            }
            None => {
                return StopOutcome {
                    exit_code: None,
                    forced: false,
                };
            }
        }

        if let Some(Err(e)) = self.registry.with_handle(identity, |h| h.kill()) {
            tracing::error!(
                bot = %identity,
                error = %e,
                "forced kill failed; dropping registry entry anyway"
            );
            return StopOutcome {
                exit_code: None,
                forced: true,
            };
        }

        StopOutcome {
            exit_code: self.wait_for_exit(identity, REAP_WAIT).await,
            forced: true,
        }
    }

    async fn wait_for_exit(&self, identity: &BotIdentity, timeout: Duration) -> Option<i32> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.registry.poll(identity)? {
                Ok(ProcessState::Exited(code)) => return Some(code),
                Ok(ProcessState::Running) => {}
                Err(e) => {
                    tracing::warn!(bot = %identity, error = %e, "poll failed");
                    return None;
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(STOP_POLL_INTERVAL).await;
        }
    }

    /// Persist a status. Failures leave the registry authoritative.
    async fn write_status(
        &self,
        identity: &BotIdentity,
        status: BotStatus,
        last_started: Option<DateTime<Utc>>,
    ) {
        if let Err(e) = self.uploads.set_status(identity, status, last_started).await {
            tracing::warn!(
                owner = %identity.owner,
                bot = %identity.name,
                %status,
                error = %e,
                "status write-through failed; registry remains authoritative"
            );
        }
    }
}

fn collect_report<T>(results: Vec<(BotIdentity, Result<T, SupervisorError>)>) -> BulkReport {
    let mut report = BulkReport::default();
    for (identity, result) in results {
        match result {
            Ok(_) => report.succeeded.push(identity),
            // Raced with another stop or a crash; nothing left to do.
            Err(SupervisorError::NotRunning(_)) => {}
            Err(e) => report.failed.push((identity, e)),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, wait_until};
    use bothost_types::error::{QuotaKind, SpawnError};
    use bothost_types::quota::UserQuota;

    fn owner(id: i64) -> Caller {
        Caller::user(UserId(id))
    }

    #[tokio::test]
    async fn start_registers_and_writes_through() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");

        let info = lm.start(&owner(1), &id).await.unwrap();
        assert_eq!(info.status, BotStatus::Running);
        assert!(lm.is_running(&id));

        let record = h.store.record(&id).unwrap();
        assert_eq!(record.status, BotStatus::Running);
        assert!(record.last_started.is_some());
    }

    #[tokio::test]
    async fn start_twice_is_already_running() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");

        lm.start(&owner(1), &id).await.unwrap();
        let err = lm.start(&owner(1), &id).await.unwrap_err();
        assert!(matches!(err, SupervisorError::AlreadyRunning(_)));
        assert_eq!(h.spawner.spawn_count(), 1);
    }

    #[tokio::test]
    async fn start_unknown_bot_is_not_found() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = BotIdentity::new(UserId(1), "ghost.py");

        let err = lm.start(&owner(1), &id).await.unwrap_err();
        assert!(matches!(err, SupervisorError::NotFound));
        assert_eq!(h.spawner.spawn_count(), 0);
    }

    #[tokio::test]
    async fn foreign_caller_is_denied_without_state_change() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");

        let err = lm.start(&owner(2), &id).await.unwrap_err();
        assert!(matches!(err, SupervisorError::AccessDenied));
        assert!(!lm.is_running(&id));

        lm.start(&owner(1), &id).await.unwrap();
        let err = lm.stop(&owner(2), &id).await.unwrap_err();
        assert!(matches!(err, SupervisorError::AccessDenied));
        assert!(lm.is_running(&id));

        // Admin may act on anyone's bot.
        lm.stop(&Caller::admin(UserId(99)), &id).await.unwrap();
        assert!(!lm.is_running(&id));
    }

    #[tokio::test]
    async fn spawn_failure_creates_no_entry() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");
        h.spawner.fail_spawns(true);

        let err = lm.start(&owner(1), &id).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn(SpawnError::NotFound(_))));
        assert!(!lm.is_running(&id));
        assert_eq!(h.store.status_of(&id), Some(BotStatus::Stopped));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");
        lm.start(&owner(1), &id).await.unwrap();
        let ctl = h.control(&id);

        let outcome = lm.stop(&owner(1), &id).await.unwrap();
        assert_eq!(outcome.exit_code, Some(-15));
        assert!(!outcome.forced);
        assert!(ctl.terminated());
        assert!(!ctl.killed());

        let err = lm.stop(&owner(1), &id).await.unwrap_err();
        assert!(matches!(err, SupervisorError::NotRunning(_)));
        assert_eq!(h.store.status_of(&id), Some(BotStatus::Stopped));
        assert_eq!(h.spawner.live_count(), 0);
    }

    #[tokio::test]
    async fn stop_escalates_to_kill_after_grace() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");
        h.spawner.spawn_stubborn(true);
        lm.start(&owner(1), &id).await.unwrap();
        let ctl = h.control(&id);

        let started = Instant::now();
        let outcome = lm.stop(&owner(1), &id).await.unwrap();
        assert!(started.elapsed() >= Harness::settings().stop_grace);
        assert!(outcome.forced);
        assert_eq!(outcome.exit_code, Some(-9));
        assert!(ctl.terminated() && ctl.killed());
        assert!(!lm.is_running(&id));
    }

    #[tokio::test]
    async fn failed_kill_still_removes_entry() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");
        h.spawner.spawn_stubborn(true);
        lm.start(&owner(1), &id).await.unwrap();
        h.control(&id).fail_kill();

        let outcome = lm.stop(&owner(1), &id).await.unwrap();
        assert!(outcome.forced);
        assert_eq!(outcome.exit_code, None);
        assert!(!lm.is_running(&id));
        assert_eq!(h.store.status_of(&id), Some(BotStatus::Stopped));

        // The identity is not blocked for future starts.
        h.spawner.spawn_stubborn(false);
        lm.start(&owner(1), &id).await.unwrap();
    }

    #[tokio::test]
    async fn persistence_failure_keeps_registry_authoritative() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");
        h.store.fail_status_writes(true);

        lm.start(&owner(1), &id).await.unwrap();
        assert!(lm.is_running(&id));
        assert_eq!(h.store.status_of(&id), Some(BotStatus::Stopped));

        lm.stop(&owner(1), &id).await.unwrap();
        assert!(!lm.is_running(&id));
    }

    #[tokio::test]
    async fn restart_replaces_the_process() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");
        let first = lm.start(&owner(1), &id).await.unwrap();

        let second = lm.restart(&owner(1), &id).await.unwrap();
        assert_ne!(first.pid, second.pid);
        assert_eq!(h.spawner.spawn_count(), 2);
        assert_eq!(h.spawner.live_count(), 1);
    }

    #[tokio::test]
    async fn restart_with_failing_spawn_leaves_bot_stopped() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");
        lm.start(&owner(1), &id).await.unwrap();
        h.spawner.fail_spawns(true);

        let err = lm.restart(&owner(1), &id).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn(_)));
        assert!(!lm.is_running(&id));
        assert_eq!(h.store.status_of(&id), Some(BotStatus::Stopped));
    }

    #[tokio::test]
    async fn restart_of_stopped_bot_is_not_running() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");

        let err = lm.restart(&owner(1), &id).await.unwrap_err();
        assert!(matches!(err, SupervisorError::NotRunning(_)));
        assert_eq!(h.spawner.spawn_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_starts_of_one_identity_spawn_once() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let lm = Arc::clone(&lm);
            let id = id.clone();
            tasks.push(tokio::spawn(async move { lm.start(&owner(1), &id).await }));
        }

        let mut ok = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => ok += 1,
                Err(SupervisorError::AlreadyRunning(_)) => {}
                Err(SupervisorError::QuotaExceeded { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(h.spawner.spawn_count(), 1);
        assert_eq!(lm.registry().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_starts_never_exceed_run_limit() {
        let h = Harness::new();
        h.store.set_quota_now(UserQuota::new(UserId(1), 10, 2));
        let lm = h.lifecycle();
        let ids: Vec<_> = (0..8).map(|i| h.seed(1, &format!("b{i}.py"))).collect();

        let mut tasks = Vec::new();
        for id in ids {
            let lm = Arc::clone(&lm);
            tasks.push(tokio::spawn(async move { lm.start(&owner(1), &id).await }));
        }
        let results: Vec<_> = join_all(tasks).await;

        let ok = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
        assert_eq!(ok, 2);
        assert_eq!(lm.registry().count_owned_by(UserId(1)), 2);
        assert_eq!(h.spawner.spawn_count(), 2);
    }

    #[tokio::test]
    async fn run_limit_frees_up_after_crash_is_reconciled() {
        let h = Harness::new();
        h.store.set_quota_now(UserQuota::new(UserId(1), 5, 3));
        let lm = h.lifecycle();
        let monitor = lm.crash_monitor(Duration::from_millis(10));
        let [b1, b2, b3, b4] = ["b1.py", "b2.py", "b3.py", "b4.py"].map(|n| h.seed(1, n));

        for id in [&b1, &b2, &b3] {
            lm.start(&owner(1), id).await.unwrap();
        }
        let err = lm.start(&owner(1), &b4).await.unwrap_err();
        assert!(matches!(
            err,
            SupervisorError::QuotaExceeded { kind: QuotaKind::Run, used: 3, limit: 3 }
        ));

        h.control(&b1).exit(0);
        monitor.scan_once().await;

        assert!(lm.admission().can_start(UserId(1), lm.registry().as_ref()).await.unwrap());
        lm.start(&owner(1), &b4).await.unwrap();
        assert_eq!(lm.registry().count_owned_by(UserId(1)), 3);
    }

    #[tokio::test]
    async fn stop_all_requires_admin_and_stops_everything() {
        let h = Harness::new();
        let lm = h.lifecycle();
        for (o, n) in [(1, "a.py"), (1, "b.py"), (2, "c.py")] {
            let id = h.seed(o, n);
            lm.start(&owner(o), &id).await.unwrap();
        }

        assert!(matches!(
            lm.stop_all(&owner(1)).await.unwrap_err(),
            SupervisorError::AccessDenied
        ));
        assert_eq!(lm.registry().len(), 3);

        let report = lm.stop_all(&Caller::admin(UserId(99))).await.unwrap();
        assert_eq!(report.succeeded.len(), 3);
        assert!(report.failed.is_empty());
        assert!(lm.registry().is_empty());
        assert_eq!(h.spawner.live_count(), 0);
    }

    #[tokio::test]
    async fn restart_all_keeps_the_same_bots_live() {
        let h = Harness::new();
        let lm = h.lifecycle();
        for n in ["a.py", "b.py"] {
            let id = h.seed(1, n);
            lm.start(&owner(1), &id).await.unwrap();
        }

        let report = lm.restart_all(&Caller::admin(UserId(99))).await.unwrap();
        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(lm.registry().len(), 2);
        assert_eq!(h.spawner.spawn_count(), 4);
        assert_eq!(h.spawner.live_count(), 2);
    }

    #[tokio::test]
    async fn shutdown_stops_every_bot() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(3, "a.py");
        lm.start(&owner(3), &id).await.unwrap();

        lm.shutdown().await;
        assert!(lm.registry().is_empty());
        assert_eq!(h.store.status_of(&id), Some(BotStatus::Stopped));
    }

    #[tokio::test]
    async fn processes_are_filtered_by_caller() {
        let h = Harness::new();
        let lm = h.lifecycle();
        for (o, n) in [(1, "a.py"), (2, "b.py")] {
            let id = h.seed(o, n);
            lm.start(&owner(o), &id).await.unwrap();
        }

        assert_eq!(lm.processes(&owner(1)).len(), 1);
        assert_eq!(lm.processes(&Caller::admin(UserId(99))).len(), 2);
    }

    #[tokio::test]
    async fn transitions_are_audited() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let id = h.seed(1, "a.py");
        lm.start(&owner(1), &id).await.unwrap();
        lm.stop(&owner(1), &id).await.unwrap();

        let store = Arc::clone(&h.store);
        assert!(wait_until(Duration::from_secs(1), || store.entries().len() == 2).await);
        let actions: Vec<_> = store.entries().iter().map(|e| e.action).collect();
        assert!(actions.contains(&AuditAction::BotStarted));
        assert!(actions.contains(&AuditAction::BotStopped));
    }
}
