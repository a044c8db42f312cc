//! BuildRunner port - コンテナ化されたビルドパイプラインの呼び出し
//!
//! 名前付き target に平坦な引数・シークレットを渡して実行し、
//! 共通の結果エンベロープ `{success, stdout, stderr, resultData?}` を返します。
//!
//! # 実装
//! - **EarthlyRunner**（impls/earthly.rs）: `earthly --artifact` で result.json を取り出す

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::ScaError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    pub target: String,
    pub args: BTreeMap<String, String>,
    pub secrets: BTreeMap<String, String>,
}

impl BuildRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }
}

/// Uniform result envelope of one build invocation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult<T = serde_json::Value> {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_data: Option<T>,
}

impl<T> BuildResult<T> {
    pub fn failure(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: stdout.into(),
            stderr: stderr.into(),
            result_data: None,
        }
    }

    /// The decoded result, present only for successful builds.
    pub fn data(&self) -> Option<&T> {
        if self.success {
            self.result_data.as_ref()
        } else {
            None
        }
    }

    /// Consumes the envelope, yielding the data only when the build succeeded.
    pub fn into_data(self) -> Result<T, (String, String)> {
        match (self.success, self.result_data) {
            (true, Some(data)) => Ok(data),
            _ => Err((self.stdout, self.stderr)),
        }
    }
}

#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Runs `request.target` and returns its envelope.
    ///
    /// A non-zero exit is reported as `success == false`, not as an error.
    /// Errors are reserved for failures reading back the artifact.
    async fn run(&self, request: &BuildRequest) -> Result<BuildResult, ScaError>;
}
