//! analyze_commits - 履歴をサンプリングして analyze_repository タスクを展開する
//!
//! 子タスクの作成はトランザクションではありません。途中で失敗した場合、
//! それまでに作成した子タスクは残り、ハンドラはエラーを返します。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::build_commands::BuildCommands;
use crate::app::task_commands::{AnalyzeRepositoryOptions, TaskCommands};
use crate::domain::{
    Outcome, RepositoryId, ScaError, TaskId, TaskStatus, sample_yearly_commits,
};
use crate::ports::RepositoryCatalog;
use crate::typed::{Handler, Task};

fn default_branch() -> String {
    "HEAD".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalyzeCommitsTask {
    pub task_id: TaskId,
    pub repository_id: RepositoryId,
    pub repository_name: String,
    pub git_clone_url: String,
    #[serde(default = "default_branch")]
    pub git_branch: String,
    #[serde(default)]
    pub is_auto_approval_enabled: bool,
}

impl Task for AnalyzeCommitsTask {
    const TYPE: &'static str = "analyze_commits";
}

pub struct AnalyzeCommitsHandler {
    builds: BuildCommands,
    repositories: Arc<dyn RepositoryCatalog>,
    tasks: TaskCommands,
    max_years: usize,
}

impl AnalyzeCommitsHandler {
    pub fn new(
        builds: BuildCommands,
        repositories: Arc<dyn RepositoryCatalog>,
        tasks: TaskCommands,
        max_years: usize,
    ) -> Self {
        Self {
            builds,
            repositories,
            tasks,
            max_years,
        }
    }
}

#[async_trait]
impl Handler<AnalyzeCommitsTask> for AnalyzeCommitsHandler {
    async fn handle(&self, task: AnalyzeCommitsTask) -> Result<Outcome, ScaError> {
        let history = match self
            .builds
            .fetch_history(&task.git_clone_url, &task.git_branch)
            .await
        {
            Ok(history) => history,
            Err(ScaError::ExternalTool { stdout, stderr, .. }) => {
                return Ok(Outcome::failed(stderr, stdout));
            }
            Err(e) => return Err(e),
        };

        let sampled = sample_yearly_commits(&history, self.max_years);
        let status = if task.is_auto_approval_enabled {
            TaskStatus::Approved
        } else {
            TaskStatus::WaitingForApproval
        };

        for commit in &sampled {
            // defaults may change between iterations
            let repository = self.repositories.get_repository(task.repository_id).await?;
            let options = AnalyzeRepositoryOptions {
                build_tool: repository.defaults.build_tool,
                repository_name: task.repository_name.clone(),
                git_clone_url: task.git_clone_url.clone(),
                git_ref: commit.hash.clone(),
                is_sonarqube_enabled: repository.defaults.is_sonarqube_enabled,
                workdir: repository.defaults.workdir,
            };
            self.tasks
                .create_analyze_repository_task(task.repository_id, &options, status)
                .await?;
        }

        info!(
            task_id = %task.task_id,
            history = history.len(),
            sampled = sampled.len(),
            "analyze_commits fanned out"
        );
        Ok(Outcome::completed())
    }
}
