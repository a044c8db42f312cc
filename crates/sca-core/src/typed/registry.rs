//! TypedRegistry - Handler の登録と管理
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Generic methods での登録と型安全性
//! - Arc による共有所有権

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{DynHandler, Handler, TypedHandler};
use super::task::Task;

/// TypedRegistry は型付き Handler を登録・管理
///
/// # 使用例
/// ```ignore
/// let mut registry = TypedRegistry::new();
/// registry.register::<AnalyzeCommitsTask, _>(handler)?;
///
/// let handler = registry.get("analyze_commits");
/// ```
#[derive(Default)]
pub struct TypedRegistry {
    handlers: HashMap<String, Arc<dyn DynHandler>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for task type '{0}' is already registered")]
    AlreadyRegistered(String),
}

impl TypedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        let task_type = T::TYPE.to_string();
        if self.handlers.contains_key(&task_type) {
            return Err(RegistryError::AlreadyRegistered(task_type));
        }
        self.handlers
            .insert(task_type, Arc::new(TypedHandler::<T, H>::new(handler)));
        Ok(())
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(task_type).cloned()
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.handlers.contains_key(task_type)
    }

    /// Registered task types, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::handler::fixtures::{EchoHandler, NoopHandler};
    use crate::typed::task::fixtures::{EchoTask, NoopTask};

    #[test]
    fn register_then_get() {
        let mut registry = TypedRegistry::new();
        registry.register::<EchoTask, _>(EchoHandler).unwrap();

        let handler = registry.get(EchoTask::TYPE).unwrap();
        assert_eq!(handler.task_type(), EchoTask::TYPE);
        assert!(registry.get("analyze_everything").is_none());
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = TypedRegistry::new();
        registry.register::<EchoTask, _>(EchoHandler).unwrap();

        let result = registry.register::<EchoTask, _>(EchoHandler);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(t)) if t == "test_echo"));
    }

    #[test]
    fn registered_types_are_sorted() {
        let mut registry = TypedRegistry::new();
        registry.register::<NoopTask, _>(NoopHandler).unwrap();
        registry.register::<EchoTask, _>(EchoHandler).unwrap();

        assert_eq!(registry.registered_types(), vec!["test_echo", "test_noop"]);
        assert!(registry.contains(NoopTask::TYPE));
    }
}
