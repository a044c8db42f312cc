//! Task trait - task type と入力型の対応付け
//!
//! # 学習ポイント
//! - Associated Constants (`const TYPE`)
//! - Trait bounds の組み合わせ (Serialize + DeserializeOwned + Send + Sync + 'static)

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Task は task type と、そのタイプの入力スキーマ（= Rust の型）を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase", deny_unknown_fields)]
/// struct ReindexTask {
///     task_id: TaskId,
///     index: String,
/// }
///
/// impl Task for ReindexTask {
///     const TYPE: &'static str = "reindex";
/// }
/// ```
///
/// 入力には、保存された options に加えて `taskId` と `repositoryId` が
/// マージされた JSON が渡されます（`PayloadCodec` 参照）。
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 永続化される task type（例: `analyze_repository`）
    const TYPE: &'static str;
}
