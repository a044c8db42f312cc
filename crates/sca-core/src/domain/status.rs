//! Status - Task と Analysis の状態、および単調遷移ガード
//!
//! # 状態遷移
//! どちらの状態も全順序を持ち、遷移は「同じか、より大きい index」へのみ許可されます。
//! - Task: waiting-for-approval(0) < approved(1) < in-progress(2) < completed(3) / failed(4)
//! - Analysis: pending(0) < completed(1) < pending-deletion(2)
//!
//! ガードは storage に触れる前に評価されるので、拒否された更新は何も書き換えません。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::ScaError;

/// A status type whose variants are totally ordered by `index()`.
pub trait OrderedStatus: Copy + Eq + fmt::Display {
    fn index(self) -> u8;
}

/// Accepts `requested` iff its index is not lower than `current`'s.
pub fn check_transition<S: OrderedStatus>(current: S, requested: S) -> Result<(), ScaError> {
    if requested.index() >= current.index() {
        Ok(())
    } else {
        Err(ScaError::StateTransition {
            from: current.to_string(),
            to: requested.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    WaitingForApproval,
    Approved,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::WaitingForApproval => "waiting-for-approval",
            TaskStatus::Approved => "approved",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Is this a terminal state (executor never picks it up again)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Statuses a task may be created with.
    pub fn is_initial(self) -> bool {
        matches!(self, TaskStatus::WaitingForApproval | TaskStatus::Approved)
    }
}

impl OrderedStatus for TaskStatus {
    fn index(self) -> u8 {
        match self {
            TaskStatus::WaitingForApproval => 0,
            TaskStatus::Approved => 1,
            TaskStatus::InProgress => 2,
            TaskStatus::Completed => 3,
            TaskStatus::Failed => 4,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStatus {
    Pending,
    Completed,
    PendingDeletion,
}

impl AnalysisStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::PendingDeletion => "pending-deletion",
        }
    }
}

impl OrderedStatus for AnalysisStatus {
    fn index(self) -> u8 {
        match self {
            AnalysisStatus::Pending => 0,
            AnalysisStatus::Completed => 1,
            AnalysisStatus::PendingDeletion => 2,
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{ "type": ..., "updatedAt": ... }` as persisted on tasks and analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusStamp<S> {
    #[serde(rename = "type")]
    pub kind: S,
    pub updated_at: DateTime<Utc>,
}

impl<S: OrderedStatus> StatusStamp<S> {
    pub fn new(kind: S, updated_at: DateTime<Utc>) -> Self {
        Self { kind, updated_at }
    }

    /// Returns the stamp after moving to `requested`, or a transition error.
    pub fn advance(&self, requested: S, now: DateTime<Utc>) -> Result<Self, ScaError> {
        check_transition(self.kind, requested)?;
        Ok(Self::new(requested, now))
    }
}
