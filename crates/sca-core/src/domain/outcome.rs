//! Outcome model: the terminal result a task handler reports back to the executor.
//!
//! Handlers never return intermediate states. Anything they report is either
//! COMPLETED or FAILED, together with whatever the external tooling printed;
//! that output becomes the task's user-visible audit trail (`Task.log`).

use serde::{Deserialize, Serialize};

use super::status::TaskStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Completed,
    Failed,
}

impl From<OutcomeKind> for TaskStatus {
    fn from(kind: OutcomeKind) -> Self {
        match kind {
            OutcomeKind::Completed => TaskStatus::Completed,
            OutcomeKind::Failed => TaskStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub kind: OutcomeKind,

    #[serde(default)]
    pub stdout: String,

    #[serde(default)]
    pub stderr: String,
}

impl Outcome {
    pub fn completed() -> Self {
        Self {
            kind: OutcomeKind::Completed,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>, stdout: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Failed,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn task_status(&self) -> TaskStatus {
        self.kind.into()
    }
}
