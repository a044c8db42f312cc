//! AnalysisCommands - 解析レコードのライフサイクル
//!
//! # 削除フロー
//! 1. PENDING_DELETION へ遷移（すでにそうなら何もしない）
//! 2. 解析を参照する結果文書を削除
//! 3. 解析文書そのものを削除
//!
//! どのステップも冪等なので、スイープ同士が重なっても安全です。

use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    Analysis, AnalysisId, AnalysisStatus, NewAnalysis, RepositoryId, ScaError,
};
use crate::ports::{AnalysisStore, Clock, ResultStore, TaskStore};

#[derive(Clone)]
pub struct AnalysisCommands {
    analyses: Arc<dyn AnalysisStore>,
    results: Arc<dyn ResultStore>,
    tasks: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
}

/// What a repository cascade touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeReport {
    pub tasks_deleted: usize,
    pub analyses_marked: usize,
}

impl AnalysisCommands {
    pub fn new(
        analyses: Arc<dyn AnalysisStore>,
        results: Arc<dyn ResultStore>,
        tasks: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            analyses,
            results,
            tasks,
            clock,
        }
    }

    /// Creates a PENDING analysis.
    pub async fn create_analysis(&self, analysis: NewAnalysis) -> Result<AnalysisId, ScaError> {
        self.analyses.insert(analysis, self.clock.now()).await
    }

    pub async fn get_analysis(&self, id: AnalysisId) -> Result<Analysis, ScaError> {
        self.analyses
            .get(id)
            .await?
            .ok_or_else(|| ScaError::not_found("analysis", id))
    }

    pub async fn update_analysis_status(
        &self,
        id: AnalysisId,
        status: AnalysisStatus,
    ) -> Result<(), ScaError> {
        let mut analysis = self.get_analysis(id).await?;
        analysis.status = analysis.status.advance(status, self.clock.now())?;
        self.analyses.upsert(analysis).await
    }

    pub async fn delete_analysis(&self, id: AnalysisId) -> Result<(), ScaError> {
        if let Some(analysis) = self.analyses.get(id).await?
            && analysis.status.kind != AnalysisStatus::PendingDeletion
        {
            self.update_analysis_status(id, AnalysisStatus::PendingDeletion)
                .await?;
        }

        let removed = self.results.delete_by_analysis(id).await?;
        self.analyses.delete(id).await?;
        debug!(analysis_id = %id, results = removed, "analysis deleted");
        Ok(())
    }

    /// Deletes every task of the repository and flags its analyses for the stuck sweep.
    pub async fn cascade_repository_deletion(
        &self,
        repository_id: RepositoryId,
    ) -> Result<CascadeReport, ScaError> {
        let tasks_deleted = self.tasks.delete_by_repository(repository_id).await?;
        let analyses_marked = self
            .analyses
            .mark_repository_for_deletion(repository_id, self.clock.now())
            .await?;
        Ok(CascadeReport {
            tasks_deleted,
            analyses_marked,
        })
    }
}
