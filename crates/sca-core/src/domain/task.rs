//! Task documents and the envelope handed to the dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{RepositoryId, TaskId};
use super::status::{StatusStamp, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskType(String);

impl TaskType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Captured process output attached to a task when it reaches a terminal status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLog {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

/// A persisted task.
///
/// `options` is stored opaquely; it is only decoded against the task type's
/// schema at dispatch time (see `typed::PayloadCodec`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: StatusStamp<TaskStatus>,
    pub options: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<RepositoryId>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub log: TaskLog,
}

impl Task {
    pub fn envelope(&self) -> TaskEnvelope {
        TaskEnvelope::new(
            self.id,
            self.task_type.clone(),
            self.options.clone(),
            self.repository_id,
        )
    }
}

/// Input for creating a task; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub options: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<RepositoryId>,
}

/// TaskType + options (+ TaskId, RepositoryId) の“運搬用”データ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    task_id: TaskId,
    task_type: TaskType,
    options: serde_json::Value,
    repository_id: Option<RepositoryId>,
}

impl TaskEnvelope {
    pub fn new(
        task_id: TaskId,
        task_type: TaskType,
        options: serde_json::Value,
        repository_id: Option<RepositoryId>,
    ) -> Self {
        Self {
            task_id,
            task_type,
            options,
            repository_id,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    pub fn options(&self) -> &serde_json::Value {
        &self.options
    }

    pub fn repository_id(&self) -> Option<RepositoryId> {
        self.repository_id
    }
}
