//! AnalysisStore / ResultStore ports - Analysis document と解析結果 document
//!
//! ResultStore は解析パイプラインが出力した `(index, document)` を保持します。
//! どの result document も `analysis.analysisId` で Analysis に紐付きます。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Analysis, AnalysisId, AnalysisStatus, NewAnalysis, RepositoryId, ResultDocument, ScaError,
};

/// Default number of documents per bulk request.
pub const DEFAULT_BULK_CHUNK_SIZE: usize = 100;

/// Filters for `AnalysisStore::search`. `None` / empty means "no filter".
///
/// Results are sorted by `(status.updatedAt, createdAt, id)` ascending.
#[derive(Debug, Clone, Default)]
pub struct AnalysisQuery {
    pub statuses: Vec<AnalysisStatus>,
    pub updated_before: Option<DateTime<Utc>>,
    pub repository_id: Option<RepositoryId>,
    pub commit_hash: Option<String>,
    pub limit: Option<usize>,
}

/// A `(repository, commit)` pair analysed more than once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepetitiveGroup {
    pub repository_id: RepositoryId,
    pub git_commit: String,
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Persists a new PENDING analysis stamped at `now`.
    async fn insert(&self, analysis: NewAnalysis, now: DateTime<Utc>)
    -> Result<AnalysisId, ScaError>;

    async fn get(&self, id: AnalysisId) -> Result<Option<Analysis>, ScaError>;

    async fn upsert(&self, analysis: Analysis) -> Result<(), ScaError>;

    /// Fails with `NotFound` when the analysis is absent.
    async fn delete(&self, id: AnalysisId) -> Result<(), ScaError>;

    async fn search(&self, query: &AnalysisQuery) -> Result<Vec<Analysis>, ScaError>;

    /// `(repository, commit)` pairs with at least two COMPLETED analyses.
    async fn repetitive_groups(&self) -> Result<Vec<RepetitiveGroup>, ScaError>;

    /// Moves every analysis of the repository to PENDING_DELETION.
    async fn mark_repository_for_deletion(
        &self,
        repository_id: RepositoryId,
        now: DateTime<Utc>,
    ) -> Result<usize, ScaError>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// One bulk request.
    async fn insert_batch(&self, batch: Vec<ResultDocument>) -> Result<(), ScaError>;

    /// Deletes every result document stamped with `analysis_id`.
    async fn delete_by_analysis(&self, analysis_id: AnalysisId) -> Result<usize, ScaError>;

    /// Splits `documents` into chunks of `chunk_size` and sends them in order.
    /// Stops at the first failing chunk; earlier chunks stay ingested.
    async fn insert_bulk(
        &self,
        documents: Vec<ResultDocument>,
        chunk_size: usize,
    ) -> Result<(), ScaError> {
        let chunk_size = chunk_size.max(1);
        let mut documents = documents.into_iter().peekable();
        while documents.peek().is_some() {
            let batch: Vec<ResultDocument> = documents.by_ref().take(chunk_size).collect();
            self.insert_batch(batch).await?;
        }
        Ok(())
    }
}
