//! GCLoop - 期限切れ artifact のガベージコレクション
//!
//! # フロー
//! 1. `list_all()` で全 artifact と経過時間を取る
//! 2. 経過時間が TTL + `CLOCK_SKEW_GRACE` を **超えた** ものだけ削除
//!    （数秒の時計のずれでは TTL 未満の artifact を消さない）
//! 3. 1 件ごとの失敗は記録して次へ（sweep 全体は止めない）
//!
//! # 設計原則
//! - sweep は冪等: 2 回続けて走らせても 2 回目は何も消さない
//! - NotFound は他の削除と競合しただけなので `missing` として数える
//! - 起動直後に 1 回、その後は `interval` ごと
//! - 停止は watch チャネル（WorkerGroup と同じ作法）

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::domain::StoreError;
use crate::ports::ArtifactStore;

/// Extra age an artifact must reach past the TTL before a sweep deletes it.
pub const CLOCK_SKEW_GRACE: Duration = Duration::from_secs(5);

/// Result of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    /// Already gone when the delete ran.
    pub missing: usize,
    pub failed: usize,
}

pub struct GCLoop {
    store: Arc<dyn ArtifactStore>,
    ttl: Duration,
    interval: Duration,
}

impl GCLoop {
    pub fn new(store: Arc<dyn ArtifactStore>, ttl: Duration, interval: Duration) -> Self {
        Self {
            store,
            ttl,
            interval,
        }
    }

    /// Delete every artifact older than the TTL plus [`CLOCK_SKEW_GRACE`].
    ///
    /// Only a failed enumeration is an error; per-artifact failures land in the report.
    pub async fn sweep(&self) -> Result<SweepReport, StoreError> {
        let artifacts = self.store.list_all().await?;
        let mut report = SweepReport {
            scanned: artifacts.len(),
            ..SweepReport::default()
        };

        let cutoff = self.ttl + CLOCK_SKEW_GRACE;
        for artifact in artifacts.iter().filter(|a| a.age > cutoff) {
            match self.store.delete(&artifact.id).await {
                Ok(()) => {
                    debug!(artifact = %artifact.id, age = ?artifact.age, "expired artifact deleted");
                    report.deleted += 1;
                }
                Err(StoreError::NotFound(_)) => {
                    debug!(artifact = %artifact.id, "artifact already gone");
                    report.missing += 1;
                }
                Err(e) => {
                    warn!(artifact = %artifact.id, error = %e, "could not delete expired artifact");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Run sweeps until the handle asks to stop.
    pub fn spawn(self) -> GcHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                if *shutdown_rx.borrow() {
                    break;
                }

                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        // sender が drop された場合も止める
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                }

                match self.sweep().await {
                    Ok(report) if report.deleted + report.missing + report.failed > 0 => {
                        info!(
                            scanned = report.scanned,
                            deleted = report.deleted,
                            missing = report.missing,
                            failed = report.failed,
                            "gc sweep finished"
                        );
                    }
                    Ok(report) => debug!(scanned = report.scanned, "gc sweep found nothing to delete"),
                    Err(e) => error!(error = %e, "gc sweep could not list artifacts"),
                }
            }
            debug!("gc loop stopped");
        });

        GcHandle { shutdown_tx, join }
    }
}

/// Handle of a running [`GCLoop`].
pub struct GcHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl GcHandle {
    /// Stop after the sweep in progress, if any.
    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            error!(error = %e, "gc loop did not stop cleanly");
        }
    }
}
