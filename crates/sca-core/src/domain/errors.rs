//! Errors - エラー型と分類
//!
//! # 分類
//! - Validation / NotFound / StateTransition: 呼び出し側の入力に起因（副作用なしで拒否）
//! - ExternalTool: ビルドツールや git の失敗（stdout/stderr を保持）
//! - UnknownTaskType: dispatch の失敗（そのタスクだけが FAILED になる）
//! - PartialIngestion: Analysis 作成後の bulk insert 失敗（補償削除のトリガー）
//! - Store / Config / Io / Json: インフラ層の障害

use thiserror::Error;

use super::ids::AnalysisId;

/// ErrorKind は ScaError の運用分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 入力が不正（リトライ無意味）
    Validation,
    /// 参照先が存在しない
    NotFound,
    /// 状態の後退を要求した
    Conflict,
    /// 外部プロセス・外部サービスの失敗
    External,
    /// ストア・ファイルシステムなどの障害
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum ScaError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} \"{id}\" not found")]
    NotFound { entity: &'static str, id: String },

    #[error("status transition rejected: {from} -> {to}")]
    StateTransition { from: String, to: String },

    #[error("external tool failed: {message}")]
    ExternalTool {
        message: String,
        stdout: String,
        stderr: String,
    },

    #[error("Task type \"{0}\" is not supported")]
    UnknownTaskType(String),

    #[error("bulk ingestion failed for {analysis_id}: {source}")]
    PartialIngestion {
        analysis_id: AnalysisId,
        #[source]
        source: Box<ScaError>,
    },

    #[error("store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ScaError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::UnknownTaskType(_) | Self::Json(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::StateTransition { .. } => ErrorKind::Conflict,
            Self::ExternalTool { .. } => ErrorKind::External,
            Self::PartialIngestion { source, .. } => source.kind(),
            Self::Store(_) | Self::Config(_) | Self::Io(_) => ErrorKind::Infrastructure,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
