//! TaskCommands - タスクの作成・状態更新・削除
//!
//! 状態更新は必ず `StatusStamp::advance` を通り、後退は StateTransition で拒否されます
//! （その場合ストアは変更されません）。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{NewTask, RepositoryId, ScaError, Task, TaskId, TaskStatus, TaskType};
use crate::ports::{Clock, Page, Pagination, SortOrder, TaskQuery, TaskStore};
use crate::typed::PayloadCodec;

pub const ANALYZE_REPOSITORY_TYPE: &str = "analyze_repository";

/// Stored options of an `analyze_repository` task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRepositoryOptions {
    pub build_tool: String,
    pub repository_name: String,
    pub git_clone_url: String,
    pub git_ref: String,
    #[serde(rename = "isSonarQubeEnabled")]
    pub is_sonarqube_enabled: bool,
    pub workdir: String,
}

/// A status change plus optional replacement logs. `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: TaskStatus,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl StatusUpdate {
    pub fn to(status: TaskStatus) -> Self {
        Self {
            status,
            stdout: None,
            stderr: None,
        }
    }

    pub fn with_logs(status: TaskStatus, stdout: String, stderr: String) -> Self {
        Self {
            status,
            stdout: Some(stdout),
            stderr: Some(stderr),
        }
    }
}

#[derive(Clone)]
pub struct TaskCommands {
    tasks: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
}

impl TaskCommands {
    pub fn new(tasks: Arc<dyn TaskStore>, clock: Arc<dyn Clock>) -> Self {
        Self { tasks, clock }
    }

    pub async fn create_task(&self, task: NewTask) -> Result<TaskId, ScaError> {
        if !task.status.is_initial() {
            return Err(ScaError::Validation(format!(
                "a task cannot be created in status {}",
                task.status
            )));
        }
        if !task.options.is_object() {
            return Err(ScaError::Validation(
                "task options must be a JSON object".into(),
            ));
        }

        let task_type = task.task_type.clone();
        let id = self.tasks.insert(task, self.clock.now()).await?;
        debug!(task_id = %id, %task_type, "task created");
        Ok(id)
    }

    pub async fn create_analyze_repository_task(
        &self,
        repository_id: RepositoryId,
        options: &AnalyzeRepositoryOptions,
        status: TaskStatus,
    ) -> Result<TaskId, ScaError> {
        self.create_task(NewTask {
            task_type: TaskType::new(ANALYZE_REPOSITORY_TYPE),
            status,
            options: PayloadCodec::encode(options)?,
            repository_id: Some(repository_id),
        })
        .await
    }

    pub async fn get_task(&self, id: TaskId) -> Result<Task, ScaError> {
        self.tasks
            .get(id)
            .await?
            .ok_or_else(|| ScaError::not_found("task", id))
    }

    /// Oldest-first page of APPROVED tasks.
    pub async fn get_pending_tasks(&self, limit: usize) -> Result<Page<Task>, ScaError> {
        self.tasks
            .list(&TaskQuery {
                statuses: vec![TaskStatus::Approved],
                repository_ids: Vec::new(),
                order: SortOrder::Asc,
                pagination: Pagination { page: 0, limit },
            })
            .await
    }

    pub async fn update_task_status(
        &self,
        id: TaskId,
        update: StatusUpdate,
    ) -> Result<(), ScaError> {
        let mut task = self.get_task(id).await?;
        task.status = task.status.advance(update.status, self.clock.now())?;
        if let Some(stdout) = update.stdout {
            task.log.stdout = stdout;
        }
        if let Some(stderr) = update.stderr {
            task.log.stderr = stderr;
        }
        self.tasks.upsert(task).await
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<(), ScaError> {
        self.tasks.delete(id).await
    }

    /// Deletes tasks whose status was last touched at or before `older_than`,
    /// except those still waiting for approval.
    pub async fn delete_old_tasks(&self, older_than: DateTime<Utc>) -> Result<usize, ScaError> {
        if self.clock.now() < older_than {
            return Ok(0);
        }
        self.tasks
            .delete_updated_before(older_than, TaskStatus::WaitingForApproval)
            .await
    }
}
