//! analyze_repository - 1 コミット分の解析パイプライン
//!
//! # ステップ
//! 1. 最新コミット情報を取得（失敗 → FAILED、解析レコードなし）
//! 2. 解析パイプラインを実行（失敗 → FAILED、解析レコードなし）
//! 3. 解析レコードを PENDING で作成
//! 4. 結果文書を一括投入
//! 5. 成功 → 解析を COMPLETED。失敗 → 解析を削除（ベストエフォート）して元のエラーを返す

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::app::analysis_commands::AnalysisCommands;
use crate::app::build_commands::{AnalysisRequest, BuildCommands};
use crate::domain::{
    AnalysisId, AnalysisStatus, GitCommit, NewAnalysis, Outcome, RepositoryId, RepositoryRef,
    ResultDocument, ResultRecord, ScaError, TaskId,
};
use crate::ports::ResultStore;
use crate::typed::{Handler, Task};

fn current_dir() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalyzeRepositoryTask {
    pub task_id: TaskId,
    pub build_tool: String,
    pub repository_id: RepositoryId,
    pub repository_name: String,
    pub git_clone_url: String,
    pub git_ref: String,
    #[serde(default, rename = "isSonarQubeEnabled")]
    pub is_sonarqube_enabled: bool,
    #[serde(default = "current_dir")]
    pub workdir: String,
}

impl Task for AnalyzeRepositoryTask {
    const TYPE: &'static str = "analyze_repository";
}

pub struct AnalyzeRepositoryHandler {
    builds: BuildCommands,
    analyses: AnalysisCommands,
    results: Arc<dyn ResultStore>,
    bulk_chunk_size: usize,
}

impl AnalyzeRepositoryHandler {
    pub fn new(
        builds: BuildCommands,
        analyses: AnalysisCommands,
        results: Arc<dyn ResultStore>,
        bulk_chunk_size: usize,
    ) -> Self {
        Self {
            builds,
            analyses,
            results,
            bulk_chunk_size,
        }
    }

    async fn store_results(
        &self,
        task: &AnalyzeRepositoryTask,
        commit: &GitCommit,
        analysis_id: AnalysisId,
        records: Vec<ResultRecord>,
    ) -> Result<(), ScaError> {
        let documents: Vec<ResultDocument> = records
            .into_iter()
            .map(|record| {
                ResultDocument::stamped(
                    record,
                    &task.repository_name,
                    &task.git_ref,
                    commit.created_at,
                    analysis_id,
                    task.task_id,
                )
            })
            .collect();

        if let Err(source) = self
            .results
            .insert_bulk(documents, self.bulk_chunk_size)
            .await
        {
            if let Err(e) = self.analyses.delete_analysis(analysis_id).await {
                error!(%analysis_id, error = %e, "failed to delete incomplete analysis");
            }
            return Err(ScaError::PartialIngestion {
                analysis_id,
                source: Box::new(source),
            });
        }

        self.analyses
            .update_analysis_status(analysis_id, AnalysisStatus::Completed)
            .await
    }
}

#[async_trait]
impl Handler<AnalyzeRepositoryTask> for AnalyzeRepositoryHandler {
    async fn handle(&self, task: AnalyzeRepositoryTask) -> Result<Outcome, ScaError> {
        let commit = match self
            .builds
            .fetch_latest_commit(&task.git_clone_url, &task.git_ref)
            .await
        {
            Ok(commit) => commit,
            Err(ScaError::ExternalTool { stdout, stderr, .. }) => {
                return Ok(Outcome::failed(stderr, stdout));
            }
            Err(e) => return Err(e),
        };

        let request = AnalysisRequest {
            build_tool: task.build_tool.clone(),
            git_clone_url: task.git_clone_url.clone(),
            git_ref: task.git_ref.clone(),
            workdir: task.workdir.clone(),
            is_sonarqube_enabled: task.is_sonarqube_enabled,
        };
        let records = match self.builds.run_analysis(&request).await {
            Ok(records) => records,
            Err(ScaError::ExternalTool { stdout, stderr, .. }) => {
                return Ok(Outcome::failed(stderr, stdout));
            }
            Err(e) => return Err(e),
        };

        let analysis_id = self
            .analyses
            .create_analysis(NewAnalysis {
                repository: RepositoryRef {
                    id: task.repository_id,
                    name: task.repository_name.clone(),
                },
                git_commit: commit.clone(),
                task_id: task.task_id,
            })
            .await?;

        let count = records.len();
        self.store_results(&task, &commit, analysis_id, records)
            .await?;

        info!(
            task_id = %task.task_id,
            %analysis_id,
            documents = count,
            commit = %commit.hash,
            "analysis stored"
        );
        Ok(Outcome::completed())
    }
}
