//! TaskStore port - Task document の正本
//!
//! 状態遷移のガードはここでは行いません（`app::task_commands` が get → check → upsert）。
//! ストアは「文書ストア」としての素朴な操作だけを提供します。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{NewTask, RepositoryId, ScaError, Task, TaskId, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 0, limit: 100 }
    }
}

/// Filters for `TaskStore::list`. Empty vectors mean "no filter".
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub statuses: Vec<TaskStatus>,
    pub repository_ids: Vec<RepositoryId>,
    /// Applied to `createdAt`, ties broken by id ascending.
    pub order: SortOrder,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persists a new task stamped at `now` and returns its generated id.
    async fn insert(&self, task: NewTask, now: DateTime<Utc>) -> Result<TaskId, ScaError>;

    async fn get(&self, id: TaskId) -> Result<Option<Task>, ScaError>;

    async fn upsert(&self, task: Task) -> Result<(), ScaError>;

    /// Fails with `NotFound` when the task is absent.
    async fn delete(&self, id: TaskId) -> Result<(), ScaError>;

    async fn list(&self, query: &TaskQuery) -> Result<Page<Task>, ScaError>;

    /// Deletes every task with `status.updatedAt <= cutoff` whose status is not
    /// `keep`. Returns the number of deleted tasks.
    async fn delete_updated_before(
        &self,
        cutoff: DateTime<Utc>,
        keep: TaskStatus,
    ) -> Result<usize, ScaError>;

    async fn delete_by_repository(&self, repository_id: RepositoryId) -> Result<usize, ScaError>;
}
