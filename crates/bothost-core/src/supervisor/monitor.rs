//! Crash monitor: periodic, non-blocking reconciliation of exited processes.
//!
//! Each cycle polls every registry entry once. An identity whose lock is held
//! by an in-flight transition is skipped and picked up next cycle, so the
//! monitor never waits behind a stop. Detection latency is therefore at most
//! one period, plus one more if the identity was busy.

use std::sync::Arc;
use std::time::Duration;

use bothost_types::activity::AuditAction;
use bothost_types::bot::BotStatus;
use bothost_types::identity::BotIdentity;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::notify::Notifier;
use crate::process::{ProcessHandle, ProcessState};
use crate::repository::activity::ActivityLog;
use crate::repository::upload::UploadRepository;
use crate::supervisor::effects::Effects;
use crate::supervisor::registry::ProcessRegistry;

/// What one scan did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub checked: usize,
    /// Identities whose process had exited, with the exit code.
    pub crashed: Vec<(BotIdentity, i32)>,
    pub skipped_busy: usize,
    /// `running` records rewritten to `stopped` because nothing was live.
    pub stale_fixed: usize,
}

pub struct CrashMonitor<H, U, A, N> {
    registry: Arc<ProcessRegistry<H>>,
    uploads: Arc<U>,
    effects: Effects<A, N>,
    period: Duration,
}

impl<H, U, A, N> CrashMonitor<H, U, A, N>
where
    H: ProcessHandle,
    U: UploadRepository,
    A: ActivityLog,
    N: Notifier,
{
    pub fn new(
        registry: Arc<ProcessRegistry<H>>,
        uploads: Arc<U>,
        effects: Effects<A, N>,
        period: Duration,
    ) -> Self {
        Self {
            registry,
            uploads,
            effects,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// One reconciliation pass over the registry, then over storage.
    pub async fn scan_once(&self) -> ScanReport {
        let mut report = ScanReport::default();

        for identity in self.registry.identities() {
            report.checked += 1;

            let Some(guard) = self.registry.try_lock(&identity) else {
                report.skipped_busy += 1;
                continue;
            };

            let code = match self.registry.poll(&identity) {
                // Removed by a stop that finished between listing and locking.
                None => continue,
                Some(Ok(ProcessState::Running)) => continue,
                Some(Ok(ProcessState::Exited(code))) => code,
                Some(Err(e)) => {
                    tracing::warn!(bot = %identity, error = %e, "poll failed; retrying next cycle");
                    continue;
                }
            };

            self.registry.set_status(&guard, BotStatus::Crashed);
            let Some(entry) = self.registry.remove(&guard) else {
                continue;
            };
            tracing::debug!(bot = %identity, status = %entry.status, pid = ?entry.pid(), "removed exited process");
            if let Err(e) = self
                .uploads
                .set_status(&identity, BotStatus::Stopped, None)
                .await
            {
                tracing::warn!(bot = %identity, error = %e, "failed to persist crash status");
            }
            drop(guard);

            tracing::warn!(
                owner = %identity.owner,
                bot = %identity.name,
                exit_code = code,
                "bot exited unexpectedly"
            );
            self.effects.notify(
                identity.owner,
                format!("⚠️ Bot Crashed: {}\nExit code: {}", identity.name, code),
            );
            self.effects
                .audit(identity.owner, AuditAction::BotCrashed, format!("Exit: {code}"));

            report.crashed.push((identity, code));
        }

        report.stale_fixed = self.reconcile_stale_records().await;
        report
    }

    /// Rewrite `running` records that have no live registry entry.
    ///
    /// Run once at startup (the registry is empty, so every such record is
    /// stale) and at the end of every scan.
    pub async fn reconcile_stale_records(&self) -> usize {
        let records = match self.uploads.list_by_status(BotStatus::Running).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list running records");
                return 0;
            }
        };

        let mut fixed = 0;
        for record in records {
            let identity = record.identity;
            if self.registry.contains(&identity) {
                continue;
            }
            // A transition in flight will write its own status.
            let Some(_guard) = self.registry.try_lock(&identity) else {
                continue;
            };
            if self.registry.contains(&identity) {
                continue;
            }
            match self
                .uploads
                .set_status(&identity, BotStatus::Stopped, None)
                .await
            {
                Ok(()) => {
                    tracing::info!(bot = %identity, "marked stale running record as stopped");
                    fixed += 1;
                }
                Err(e) => tracing::warn!(bot = %identity, error = %e, "failed to fix stale record"),
            }
        }
        fixed
    }

    /// Scan every period until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        tracing::info!(period_secs = self.period.as_secs_f64(), "crash monitor started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("crash monitor stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.scan_once().await;
                    if !report.crashed.is_empty() || report.stale_fixed > 0 {
                        tracing::debug!(
                            checked = report.checked,
                            crashed = report.crashed.len(),
                            skipped_busy = report.skipped_busy,
                            stale_fixed = report.stale_fixed,
                            "crash monitor cycle"
                        );
                    }
                }
            }
        }
    }

    /// Run on a background task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, wait_until};
    use bothost_types::identity::{Caller, UserId};

    #[tokio::test]
    async fn exited_process_is_reconciled_once() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let monitor = lm.crash_monitor(Duration::from_secs(30));
        let id = h.seed(1, "a.py");
        lm.start(&Caller::user(UserId(1)), &id).await.unwrap();

        h.control(&id).exit(1);
        let report = monitor.scan_once().await;
        assert_eq!(report.crashed, vec![(id.clone(), 1)]);
        assert!(!lm.is_running(&id));
        assert_eq!(h.store.status_of(&id), Some(BotStatus::Stopped));

        // A second scan finds nothing more to do.
        let report = monitor.scan_once().await;
        assert!(report.crashed.is_empty());
        assert_eq!(lm.registry().lock_slots(), 0);

        let notifier = Arc::clone(&h.notifier);
        assert!(wait_until(Duration::from_secs(1), || !notifier.messages().is_empty()).await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, UserId(1));
        assert!(messages[0].1.contains("Exit code: 1"));

        let store = Arc::clone(&h.store);
        assert!(
            wait_until(Duration::from_secs(1), || {
                store
                    .entries()
                    .iter()
                    .any(|e| e.action == AuditAction::BotCrashed && e.details == "Exit: 1")
            })
            .await
        );
    }

    #[tokio::test]
    async fn running_processes_are_left_alone() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let monitor = lm.crash_monitor(Duration::from_secs(30));
        let id = h.seed(1, "a.py");
        lm.start(&Caller::user(UserId(1)), &id).await.unwrap();

        let report = monitor.scan_once().await;
        assert_eq!(report.checked, 1);
        assert!(report.crashed.is_empty());
        assert!(lm.is_running(&id));
    }

    #[tokio::test]
    async fn busy_identity_is_skipped_not_awaited() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let monitor = lm.crash_monitor(Duration::from_secs(30));
        let id = h.seed(1, "a.py");
        lm.start(&Caller::user(UserId(1)), &id).await.unwrap();
        h.control(&id).exit(2);

        let guard = lm.registry().lock(&id).await;
        let report = monitor.scan_once().await;
        assert_eq!(report.skipped_busy, 1);
        assert!(lm.is_running(&id));
        drop(guard);

        let report = monitor.scan_once().await;
        assert_eq!(report.crashed, vec![(id, 2)]);
    }

    #[tokio::test]
    async fn stale_running_records_are_fixed() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let monitor = lm.crash_monitor(Duration::from_secs(30));
        let mut record = crate::testing::upload_record(5, "old.py");
        record.status = BotStatus::Running;
        let id = record.identity.clone();
        h.store.insert_record(record);

        assert_eq!(monitor.reconcile_stale_records().await, 1);
        assert_eq!(h.store.status_of(&id), Some(BotStatus::Stopped));
        assert_eq!(monitor.reconcile_stale_records().await, 0);
    }

    #[tokio::test]
    async fn background_loop_detects_exit_within_a_few_periods() {
        let h = Harness::new();
        let lm = h.lifecycle();
        let period = Duration::from_millis(20);
        let cancel = CancellationToken::new();
        let task = lm.crash_monitor(period).spawn(cancel.clone());

        let id = h.seed(1, "a.py");
        lm.start(&Caller::user(UserId(1)), &id).await.unwrap();
        h.control(&id).exit(0);

        let registry = Arc::clone(lm.registry());
        let probe = id.clone();
        assert!(wait_until(period * 10, || !registry.contains(&probe)).await);

        cancel.cancel();
        task.await.unwrap();
    }
}
