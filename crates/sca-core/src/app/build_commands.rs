//! BuildCommands - 名前付き build target を型付きで呼び出す
//!
//! 各メソッドは target と引数の組み立て、結果エンベロープの厳格なデコードを担当します。
//! ビルド失敗は `ScaError::ExternalTool`（stdout/stderr 付き）として返ります。

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::domain::{GitCommit, ResultRecord, ScaError};
use crate::ports::{BuildRequest, BuildRunner};

pub const TARGET_LATEST_COMMIT: &str = "git-latest-commit-result";
pub const TARGET_HISTORY: &str = "git-history-result";
pub const TARGET_ANALYZE_REPOSITORY: &str = "analyze-repository-result";

/// Parameters of one analysis pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub build_tool: String,
    pub git_clone_url: String,
    pub git_ref: String,
    pub workdir: String,
    pub is_sonarqube_enabled: bool,
}

#[derive(Clone)]
pub struct BuildCommands {
    runner: Arc<dyn BuildRunner>,
}

impl BuildCommands {
    pub fn new(runner: Arc<dyn BuildRunner>) -> Self {
        Self { runner }
    }

    pub async fn fetch_latest_commit(
        &self,
        git_clone_url: &str,
        git_ref: &str,
    ) -> Result<GitCommit, ScaError> {
        let request = BuildRequest::new(TARGET_LATEST_COMMIT)
            .arg("REPO_GIT_CLONE_URL", git_clone_url)
            .arg("REPO_GIT_COMMIT_HASH", git_ref);
        self.run_typed(&request).await
    }

    /// Newest-first history of `branch`.
    pub async fn fetch_history(
        &self,
        git_clone_url: &str,
        branch: &str,
    ) -> Result<Vec<GitCommit>, ScaError> {
        let request = BuildRequest::new(TARGET_HISTORY)
            .arg("REPO_GIT_CLONE_URL", git_clone_url)
            .arg("REPO_GIT_COMMIT_HASH", branch)
            .arg("REPO_GIT_PULL", "true");
        self.run_typed(&request).await
    }

    pub async fn run_analysis(
        &self,
        analysis: &AnalysisRequest,
    ) -> Result<Vec<ResultRecord>, ScaError> {
        let request = BuildRequest::new(TARGET_ANALYZE_REPOSITORY)
            .arg("BUILD_TOOL", &analysis.build_tool)
            .arg("REPO_GIT_CLONE_URL", &analysis.git_clone_url)
            .arg("REPO_GIT_COMMIT_HASH", &analysis.git_ref)
            .arg("REPO_WORKDIR", &analysis.workdir)
            .arg("SONARQUBE_ENABLED", analysis.is_sonarqube_enabled.to_string());
        self.run_typed(&request).await
    }

    async fn run_typed<T: DeserializeOwned>(&self, request: &BuildRequest) -> Result<T, ScaError> {
        let result = self.runner.run(request).await?;
        let data = result
            .into_data()
            .map_err(|(stdout, stderr)| ScaError::ExternalTool {
                message: format!("build target {} failed", request.target),
                stdout,
                stderr,
            })?;

        serde_json::from_value(data).map_err(|e| {
            ScaError::Validation(format!(
                "unexpected result of build target {}: {e}",
                request.target
            ))
        })
    }
}
