//! MaintenanceSweeps - タスクと解析のガベージコレクション
//!
//! | スイープ | 対象 |
//! |---|---|
//! | stuck analyses | PENDING / PENDING_DELETION のまま timeout を超えた解析 |
//! | repetitive analyses | 同じ (repository, commit) の COMPLETED 解析のうち最新以外 |
//! | old tasks | retention を超えたタスク（承認待ちは除く） |
//!
//! 各スイープは要素ごとに独立して処理し、失敗はログに残して続行します。
//! すでに消えている要素（NotFound）は「やることがない」として扱います。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::app::analysis_commands::AnalysisCommands;
use crate::app::scheduler::PeriodicJob;
use crate::app::task_commands::TaskCommands;
use crate::config::MaintenanceConfig;
use crate::domain::{AnalysisId, AnalysisStatus, ScaError};
use crate::ports::{AnalysisQuery, AnalysisStore, Clock};

/// Per-run counters of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub deleted: usize,
    pub failed: usize,
}

pub struct MaintenanceSweeps {
    analyses: Arc<dyn AnalysisStore>,
    analysis_commands: AnalysisCommands,
    task_commands: TaskCommands,
    clock: Arc<dyn Clock>,
    config: MaintenanceConfig,
}

impl MaintenanceSweeps {
    pub fn new(
        analyses: Arc<dyn AnalysisStore>,
        analysis_commands: AnalysisCommands,
        task_commands: TaskCommands,
        clock: Arc<dyn Clock>,
        config: MaintenanceConfig,
    ) -> Self {
        Self {
            analyses,
            analysis_commands,
            task_commands,
            clock,
            config,
        }
    }

    /// Force-deletes analyses left PENDING (crashed pipeline) or PENDING_DELETION
    /// (repository cascade) longer than the timeout.
    pub async fn delete_stuck_analyses(&self) -> Result<SweepReport, ScaError> {
        let Some(cutoff) = self.cutoff(self.config.stuck_analysis_timeout()) else {
            debug!("stuck analysis timeout out of range, skipping");
            return Ok(SweepReport::default());
        };
        debug!(%cutoff, "deletion of stuck analyses started");

        let stuck = self
            .analyses
            .search(&AnalysisQuery {
                statuses: vec![AnalysisStatus::Pending, AnalysisStatus::PendingDeletion],
                updated_before: Some(cutoff),
                limit: Some(self.config.batch_size),
                ..AnalysisQuery::default()
            })
            .await?;

        let mut report = SweepReport::default();
        for analysis in stuck {
            self.delete_one(analysis.id, &mut report).await;
        }

        debug!(?report, "deletion of stuck analyses completed");
        Ok(report)
    }

    /// Keeps only the most recently updated COMPLETED analysis per (repository, commit).
    pub async fn delete_repetitive_analyses(&self) -> Result<SweepReport, ScaError> {
        debug!("deletion of repetitive analyses started");
        let groups = self.analyses.repetitive_groups().await?;

        let mut report = SweepReport::default();
        for group in groups {
            debug!(repository_id = %group.repository_id, commit = %group.git_commit, "deleting repetitive analyses");

            let mut duplicates = match self
                .analyses
                .search(&AnalysisQuery {
                    statuses: vec![AnalysisStatus::Completed],
                    repository_id: Some(group.repository_id),
                    commit_hash: Some(group.git_commit.clone()),
                    ..AnalysisQuery::default()
                })
                .await
            {
                Ok(found) => found,
                Err(e) => {
                    warn!(repository_id = %group.repository_id, error = %e, "listing repetitive analyses failed");
                    report.failed += 1;
                    continue;
                }
            };

            // sorted oldest first; the newest survives
            duplicates.pop();
            for analysis in duplicates {
                self.delete_one(analysis.id, &mut report).await;
            }
        }

        debug!(?report, "deletion of repetitive analyses completed");
        Ok(report)
    }

    pub async fn delete_old_tasks(&self) -> Result<usize, ScaError> {
        let Some(older_than) = self.cutoff(self.config.old_task_retention()) else {
            debug!("task retention out of range, skipping");
            return Ok(0);
        };
        debug!(%older_than, "deleting old tasks");
        let deleted = self.task_commands.delete_old_tasks(older_than).await?;
        debug!(deleted, "deletion of old tasks completed");
        Ok(deleted)
    }

    /// `now - age`, or `None` when the age is unrepresentable or the result
    /// would precede the earliest representable time.
    fn cutoff(&self, age: Option<Duration>) -> Option<DateTime<Utc>> {
        self.clock.now().checked_sub_signed(age?)
    }

    async fn delete_one(&self, id: AnalysisId, report: &mut SweepReport) {
        match self.analysis_commands.delete_analysis(id).await {
            Ok(()) => report.deleted += 1,
            Err(e) if e.is_not_found() => debug!(analysis_id = %id, "already deleted"),
            Err(e) => {
                report.failed += 1;
                warn!(analysis_id = %id, error = %e, "failed to delete analysis");
            }
        }
    }

    /// Spawns the three sweeps on independent timers.
    pub fn start(self: &Arc<Self>) -> Vec<PeriodicJob> {
        let period = self.config.interval();

        let stuck = {
            let sweeps = Arc::clone(self);
            PeriodicJob::spawn("stuck-analyses-sweep", period, move || {
                let sweeps = Arc::clone(&sweeps);
                async move {
                    if let Err(e) = sweeps.delete_stuck_analyses().await {
                        warn!(error = %e, "stuck analyses sweep failed");
                    }
                }
            })
        };
        let repetitive = {
            let sweeps = Arc::clone(self);
            PeriodicJob::spawn("repetitive-analyses-sweep", period, move || {
                let sweeps = Arc::clone(&sweeps);
                async move {
                    if let Err(e) = sweeps.delete_repetitive_analyses().await {
                        warn!(error = %e, "repetitive analyses sweep failed");
                    }
                }
            })
        };
        let old_tasks = {
            let sweeps = Arc::clone(self);
            PeriodicJob::spawn("old-tasks-sweep", period, move || {
                let sweeps = Arc::clone(&sweeps);
                async move {
                    if let Err(e) = sweeps.delete_old_tasks().await {
                        warn!(error = %e, "old tasks sweep failed");
                    }
                }
            })
        };

        vec![stuck, repetitive, old_tasks]
    }
}
