//! MonoTaskExecutor - 承認済みタスクを 1 件ずつ実行するスケジューラ
//!
//! # サイクル
//! 1. APPROVED のタスクを古い順に 1 ページ取得（失敗時は空バッチ扱い）
//! 2. 各タスクを順番に実行: IN_PROGRESS → dispatch → 終端状態 + ログ
//! 3. 1 件の失敗はバッチの残りを止めない
//!
//! サイクルは重ならない。タイマー経由でも、`process_tasks` を直接呼んだ場合でも同じです。

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::app::dispatcher::TaskDispatcher;
use crate::app::scheduler::PeriodicJob;
use crate::app::task_commands::{StatusUpdate, TaskCommands};
use crate::config::ExecutorConfig;
use crate::domain::{ScaError, Task, TaskId, TaskStatus};

/// Summary of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub skipped: bool,
    pub listed: usize,
    pub completed: usize,
    pub failed: usize,
    pub errors: usize,
}

pub struct MonoTaskExecutor {
    tasks: TaskCommands,
    dispatcher: Arc<TaskDispatcher>,
    config: ExecutorConfig,
    cycle: Mutex<()>,
}

impl MonoTaskExecutor {
    pub fn new(tasks: TaskCommands, dispatcher: Arc<TaskDispatcher>, config: ExecutorConfig) -> Self {
        Self {
            tasks,
            dispatcher,
            config,
            cycle: Mutex::new(()),
        }
    }

    /// Starts polling every `poll_interval`.
    pub fn start(self: &Arc<Self>) -> PeriodicJob {
        let executor = Arc::clone(self);
        PeriodicJob::spawn(
            "mono-task-executor",
            self.config.poll_interval(),
            move || {
                let executor = Arc::clone(&executor);
                async move {
                    executor.process_tasks().await;
                }
            },
        )
    }

    /// Runs one cycle. Returns immediately with `skipped` if a cycle is already running.
    pub async fn process_tasks(&self) -> CycleReport {
        let Ok(_guard) = self.cycle.try_lock() else {
            debug!("previous cycle still running, skipping");
            return CycleReport {
                skipped: true,
                ..CycleReport::default()
            };
        };

        debug!("processing of pending tasks started");
        let pending = self.pending_tasks().await;
        if pending.is_empty() {
            debug!("no pending task");
        }

        let mut report = CycleReport {
            listed: pending.len(),
            ..CycleReport::default()
        };
        for task in &pending {
            match self.execute_task(task).await {
                Ok(TaskStatus::Completed) => report.completed += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    report.errors += 1;
                    error!(task_id = %task.id, error = %e, "unexpected task execution error");
                }
            }
        }

        debug!(?report, "processing of pending tasks completed");
        report
    }

    async fn pending_tasks(&self) -> Vec<Task> {
        match self.tasks.get_pending_tasks(self.config.page_size).await {
            Ok(page) => page.items,
            Err(e) => {
                error!(error = %e, "unexpected error encountered while listing tasks");
                Vec::new()
            }
        }
    }

    /// Executes one task and returns the terminal status it was left in.
    pub async fn execute_task(&self, task: &Task) -> Result<TaskStatus, ScaError> {
        let started = Instant::now();
        log_task(
            started,
            task.id,
            &format!("Task {} started - {}", task.task_type, task.options),
        );

        match self.run_to_completion(task).await {
            Ok(status) => {
                log_task(
                    started,
                    task.id,
                    &format!("Task {} finished with status \"{status}\"", task.task_type),
                );
                Ok(status)
            }
            Err(e) => {
                log_task(
                    started,
                    task.id,
                    &format!("Task {} failed - {e}", task.task_type),
                );
                self.tasks
                    .update_task_status(
                        task.id,
                        StatusUpdate::with_logs(TaskStatus::Failed, String::new(), String::new()),
                    )
                    .await?;
                Ok(TaskStatus::Failed)
            }
        }
    }

    async fn run_to_completion(&self, task: &Task) -> Result<TaskStatus, ScaError> {
        self.tasks
            .update_task_status(task.id, StatusUpdate::to(TaskStatus::InProgress))
            .await?;

        let outcome = self.dispatcher.dispatch(&task.envelope()).await?;
        let status = outcome.task_status();
        self.tasks
            .update_task_status(
                task.id,
                StatusUpdate::with_logs(status, outcome.stdout, outcome.stderr),
            )
            .await?;
        Ok(status)
    }
}

fn log_task(started: Instant, task_id: TaskId, message: &str) {
    let elapsed = started.elapsed().as_secs_f64();
    info!("[{task_id}] [+{elapsed:.3}s] {message}");
}
