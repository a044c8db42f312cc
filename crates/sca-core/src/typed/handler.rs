//! Handler trait - Task を実行する Handler の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (Handler<T>)
//! - Object-safe trait (DynHandler)
//! - Type erasure パターン (TypedHandler<T, H> → DynHandler)

use std::marker::PhantomData;

use async_trait::async_trait;

use super::codec::PayloadCodec;
use super::task::Task;
use crate::domain::{Outcome, ScaError, TaskEnvelope};

/// Handler は Task を実行して Outcome を返す
///
/// 外部ツールの失敗は `Ok(Outcome::failed(..))` として報告し、
/// それ以外（ストア障害、補償後の再送出など）は `Err` で返します。
/// どちらの場合もタスクは FAILED で終わりますが、ログに残る内容が異なります。
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, task: T) -> Result<Outcome, ScaError>;
}

/// DynHandler は object-safe な Handler の抽象化
///
/// `HashMap<String, Arc<dyn DynHandler>>` に格納するための型消去層です。
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(&self, envelope: &TaskEnvelope) -> Result<Outcome, ScaError>;
    fn task_type(&self) -> &'static str;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn handle_dyn(&self, envelope: &TaskEnvelope) -> Result<Outcome, ScaError> {
        let task: T = PayloadCodec::decode(envelope)?;
        self.handler.handle(task).await
    }

    fn task_type(&self) -> &'static str {
        T::TYPE
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::EchoHandler;
    use super::*;
    use crate::domain::{OutcomeKind, TaskId, TaskType};
    use crate::typed::task::fixtures::EchoTask;
    use serde_json::json;
    use ulid::Ulid;

    fn envelope(options: serde_json::Value) -> TaskEnvelope {
        TaskEnvelope::new(
            TaskId::from_ulid(Ulid::new()),
            TaskType::new(EchoTask::TYPE),
            options,
            None,
        )
    }

    #[tokio::test]
    async fn typed_handler_decodes_and_runs() {
        let handler = TypedHandler::<EchoTask, _>::new(EchoHandler);

        let outcome = handler
            .handle_dyn(&envelope(json!({ "message": "hello" })))
            .await
            .unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Completed);
        assert_eq!(outcome.stdout, "hello");
        assert_eq!(handler.task_type(), "test_echo");
    }

    #[tokio::test]
    async fn malformed_options_surface_as_validation_error() {
        let handler = TypedHandler::<EchoTask, _>::new(EchoHandler);

        let err = handler
            .handle_dyn(&envelope(json!({ "msg": "typo" })))
            .await
            .unwrap_err();
        assert!(matches!(err, ScaError::Validation(_)));
    }
}
