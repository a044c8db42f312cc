//! PayloadCodec - 保存された options と Task 型の相互変換
//!
//! # デコードフロー
//! 1. options（JSON object）に `taskId` / `repositoryId` をマージ
//! 2. serde_json で T にデシリアライズ（＝ task type ごとのスキーマ検証）
//! 3. 失敗時は ScaError::Validation（そのタスクだけが FAILED になる）

use serde::Serialize;
use serde_json::{Map, Value};

use super::task::Task;
use crate::domain::{ScaError, TaskEnvelope};

pub struct PayloadCodec;

impl PayloadCodec {
    /// Builds the handler input for `T` from an envelope.
    ///
    /// The envelope's ids win over any same-named keys in the stored options.
    pub fn decode<T: Task>(envelope: &TaskEnvelope) -> Result<T, ScaError> {
        let mut input = match envelope.options() {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(ScaError::Validation(format!(
                    "options of task {} must be an object, got {other}",
                    envelope.task_id()
                )));
            }
        };

        input.insert("taskId".to_string(), serde_json::to_value(envelope.task_id())?);
        match envelope.repository_id() {
            Some(repository_id) => {
                input.insert(
                    "repositoryId".to_string(),
                    serde_json::to_value(repository_id)?,
                );
            }
            None => {
                input.remove("repositoryId");
            }
        }

        serde_json::from_value(Value::Object(input)).map_err(|e| {
            ScaError::Validation(format!("invalid options for task type {}: {e}", T::TYPE))
        })
    }

    /// Serializes typed options for storage, dropping the envelope-owned ids.
    pub fn encode<T: Serialize>(options: &T) -> Result<Value, ScaError> {
        let mut value = serde_json::to_value(options)?;
        if let Value::Object(map) = &mut value {
            map.remove("taskId");
            map.remove("repositoryId");
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RepositoryId, TaskId, TaskType};
    use crate::typed::task::fixtures::EchoTask;
    use serde_json::json;
    use ulid::Ulid;

    fn envelope(options: Value) -> TaskEnvelope {
        TaskEnvelope::new(
            TaskId::from_ulid(Ulid::new()),
            TaskType::new(EchoTask::TYPE),
            options,
            None,
        )
    }

    #[test]
    fn decode_merges_task_id() {
        let env = envelope(json!({ "message": "hi" }));
        let task: EchoTask = PayloadCodec::decode(&env).unwrap();
        assert_eq!(task.task_id, env.task_id());
        assert_eq!(task.message, "hi");
    }

    #[test]
    fn decode_rejects_unknown_fields() {
        let env = envelope(json!({ "message": "hi", "unexpected": 1 }));
        let err = PayloadCodec::decode::<EchoTask>(&env).unwrap_err();
        assert!(matches!(err, ScaError::Validation(_)));
    }

    #[test]
    fn decode_rejects_non_object_options() {
        let env = envelope(json!([1, 2, 3]));
        assert!(PayloadCodec::decode::<EchoTask>(&env).is_err());
    }

    #[test]
    fn envelope_ids_override_stored_ones() {
        let repo = RepositoryId::from_ulid(Ulid::new());
        let env = TaskEnvelope::new(
            TaskId::from_ulid(Ulid::new()),
            TaskType::new("x"),
            json!({ "taskId": "bogus", "repositoryId": "bogus" }),
            Some(repo),
        );

        #[derive(Serialize, serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Ids {
            task_id: TaskId,
            repository_id: RepositoryId,
        }
        impl Task for Ids {
            const TYPE: &'static str = "ids";
        }

        let ids: Ids = PayloadCodec::decode(&env).unwrap();
        assert_eq!(ids.task_id, env.task_id());
        assert_eq!(ids.repository_id, repo);
    }

    #[test]
    fn encode_strips_envelope_ids() {
        let task = EchoTask {
            task_id: TaskId::from_ulid(Ulid::new()),
            message: "m".into(),
            fail: false,
        };
        let v = PayloadCodec::encode(&task).unwrap();
        assert!(v.get("taskId").is_none());
        assert_eq!(v["message"], "m");
    }
}
