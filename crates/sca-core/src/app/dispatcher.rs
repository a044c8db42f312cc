//! TaskDispatcher - task type から Handler を引いて実行する
//!
//! 登録済みの Handler が無い task type は `UnknownTaskType` になり、
//! そのタスクだけが FAILED になります。

use std::sync::Arc;

use crate::domain::{Outcome, ScaError, TaskEnvelope};
use crate::typed::TypedRegistry;

pub struct TaskDispatcher {
    registry: Arc<TypedRegistry>,
}

impl TaskDispatcher {
    pub fn new(registry: Arc<TypedRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypedRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, envelope: &TaskEnvelope) -> Result<Outcome, ScaError> {
        let task_type = envelope.task_type().as_str();
        let handler = self
            .registry
            .get(task_type)
            .ok_or_else(|| ScaError::UnknownTaskType(task_type.to_string()))?;

        handler.handle_dyn(envelope).await
    }
}
