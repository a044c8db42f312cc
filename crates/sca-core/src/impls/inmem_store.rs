//! InMemoryStore - 開発用・テスト用の文書ストア
//!
//! TaskStore / AnalysisStore / ResultStore / RepositoryCatalog をひとつの状態で実装します。
//!
//! # 学習ポイント
//! - `tokio::sync::Mutex` で状態全体を守る（ロックを跨いだ外部 await はしない）
//! - ひとつの構造体に複数の port trait を実装する

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    Analysis, AnalysisId, AnalysisStatus, NewAnalysis, NewTask, Repository, RepositoryId,
    ResultDocument, ScaError, StatusStamp, Task, TaskId, TaskLog, TaskStatus,
};
use crate::ports::{
    AnalysisQuery, AnalysisStore, IdGenerator, Page, RepetitiveGroup, RepositoryCatalog,
    ResultStore, SortOrder, SystemClock, TaskQuery, TaskStore, UlidGenerator,
};

#[derive(Default)]
struct StoreState {
    tasks: HashMap<TaskId, Task>,
    analyses: HashMap<AnalysisId, Analysis>,
    results: Vec<ResultDocument>,
    repositories: HashMap<RepositoryId, Repository>,
}

pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryStore {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            ids,
        }
    }

    pub async fn put_repository(&self, repository: Repository) {
        let mut state = self.state.lock().await;
        state.repositories.insert(repository.id, repository);
    }

    pub async fn remove_repository(&self, id: RepositoryId) -> Option<Repository> {
        self.state.lock().await.repositories.remove(&id)
    }

    /// Snapshot of every stored result document.
    pub async fn results(&self) -> Vec<ResultDocument> {
        self.state.lock().await.results.clone()
    }

    pub async fn all_tasks(&self) -> Vec<Task> {
        let state = self.state.lock().await;
        let mut tasks: Vec<Task> = state.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        tasks
    }

    pub async fn all_analyses(&self) -> Vec<Analysis> {
        let state = self.state.lock().await;
        let mut analyses: Vec<Analysis> = state.analyses.values().cloned().collect();
        analyses.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        analyses
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(UlidGenerator::new(Arc::new(SystemClock))))
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn insert(&self, task: NewTask, now: DateTime<Utc>) -> Result<TaskId, ScaError> {
        let id = self.ids.generate_task_id();
        let record = Task {
            id,
            task_type: task.task_type,
            status: StatusStamp::new(task.status, now),
            options: task.options,
            repository_id: task.repository_id,
            created_at: now,
            log: TaskLog::default(),
        };
        self.state.lock().await.tasks.insert(id, record);
        Ok(id)
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, ScaError> {
        Ok(self.state.lock().await.tasks.get(&id).cloned())
    }

    async fn upsert(&self, task: Task) -> Result<(), ScaError> {
        self.state.lock().await.tasks.insert(task.id, task);
        Ok(())
    }

    async fn delete(&self, id: TaskId) -> Result<(), ScaError> {
        match self.state.lock().await.tasks.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ScaError::not_found("task", id)),
        }
    }

    async fn list(&self, query: &TaskQuery) -> Result<Page<Task>, ScaError> {
        let state = self.state.lock().await;
        let mut matched: Vec<&Task> = state
            .tasks
            .values()
            .filter(|t| query.statuses.is_empty() || query.statuses.contains(&t.status.kind))
            .filter(|t| {
                query.repository_ids.is_empty()
                    || t.repository_id
                        .is_some_and(|r| query.repository_ids.contains(&r))
            })
            .collect();

        matched.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        if query.order == SortOrder::Desc {
            matched.reverse();
        }

        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(query.pagination.page * query.pagination.limit)
            .take(query.pagination.limit)
            .cloned()
            .collect();
        Ok(Page { items, total })
    }

    async fn delete_updated_before(
        &self,
        cutoff: DateTime<Utc>,
        keep: TaskStatus,
    ) -> Result<usize, ScaError> {
        let mut state = self.state.lock().await;
        let before = state.tasks.len();
        state
            .tasks
            .retain(|_, t| t.status.updated_at > cutoff || t.status.kind == keep);
        Ok(before - state.tasks.len())
    }

    async fn delete_by_repository(&self, repository_id: RepositoryId) -> Result<usize, ScaError> {
        let mut state = self.state.lock().await;
        let before = state.tasks.len();
        state
            .tasks
            .retain(|_, t| t.repository_id != Some(repository_id));
        Ok(before - state.tasks.len())
    }
}

#[async_trait]
impl AnalysisStore for InMemoryStore {
    async fn insert(
        &self,
        analysis: NewAnalysis,
        now: DateTime<Utc>,
    ) -> Result<AnalysisId, ScaError> {
        let id = self.ids.generate_analysis_id();
        let record = Analysis {
            id,
            repository: analysis.repository,
            git_commit: analysis.git_commit,
            task_id: analysis.task_id,
            status: StatusStamp::new(AnalysisStatus::Pending, now),
            created_at: now,
        };
        self.state.lock().await.analyses.insert(id, record);
        Ok(id)
    }

    async fn get(&self, id: AnalysisId) -> Result<Option<Analysis>, ScaError> {
        Ok(self.state.lock().await.analyses.get(&id).cloned())
    }

    async fn upsert(&self, analysis: Analysis) -> Result<(), ScaError> {
        self.state.lock().await.analyses.insert(analysis.id, analysis);
        Ok(())
    }

    async fn delete(&self, id: AnalysisId) -> Result<(), ScaError> {
        match self.state.lock().await.analyses.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ScaError::not_found("analysis", id)),
        }
    }

    async fn search(&self, query: &AnalysisQuery) -> Result<Vec<Analysis>, ScaError> {
        let state = self.state.lock().await;
        let mut matched: Vec<&Analysis> = state
            .analyses
            .values()
            .filter(|a| query.statuses.is_empty() || query.statuses.contains(&a.status.kind))
            .filter(|a| query.updated_before.is_none_or(|c| a.status.updated_at <= c))
            .filter(|a| query.repository_id.is_none_or(|r| a.repository.id == r))
            .filter(|a| {
                query
                    .commit_hash
                    .as_deref()
                    .is_none_or(|h| a.git_commit.hash == h)
            })
            .collect();

        matched.sort_by(|a, b| {
            (a.status.updated_at, a.created_at, a.id).cmp(&(
                b.status.updated_at,
                b.created_at,
                b.id,
            ))
        });

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matched.into_iter().take(limit).cloned().collect())
    }

    async fn repetitive_groups(&self) -> Result<Vec<RepetitiveGroup>, ScaError> {
        let state = self.state.lock().await;
        let mut counts: BTreeMap<(RepositoryId, &str), usize> = BTreeMap::new();
        for analysis in state.analyses.values() {
            if analysis.status.kind == AnalysisStatus::Completed {
                *counts
                    .entry((analysis.repository.id, analysis.git_commit.hash.as_str()))
                    .or_default() += 1;
            }
        }

        Ok(counts
            .into_iter()
            .filter(|(_, n)| *n >= 2)
            .map(|((repository_id, hash), _)| RepetitiveGroup {
                repository_id,
                git_commit: hash.to_string(),
            })
            .collect())
    }

    async fn mark_repository_for_deletion(
        &self,
        repository_id: RepositoryId,
        now: DateTime<Utc>,
    ) -> Result<usize, ScaError> {
        let mut state = self.state.lock().await;
        let mut updated = 0;
        for analysis in state
            .analyses
            .values_mut()
            .filter(|a| a.repository.id == repository_id)
        {
            analysis.status = StatusStamp::new(AnalysisStatus::PendingDeletion, now);
            updated += 1;
        }
        Ok(updated)
    }
}

#[async_trait]
impl ResultStore for InMemoryStore {
    async fn insert_batch(&self, batch: Vec<ResultDocument>) -> Result<(), ScaError> {
        self.state.lock().await.results.extend(batch);
        Ok(())
    }

    async fn delete_by_analysis(&self, analysis_id: AnalysisId) -> Result<usize, ScaError> {
        let mut state = self.state.lock().await;
        let before = state.results.len();
        state
            .results
            .retain(|doc| doc.analysis_id() != Some(analysis_id));
        Ok(before - state.results.len())
    }
}

#[async_trait]
impl RepositoryCatalog for InMemoryStore {
    async fn get_repository(&self, id: RepositoryId) -> Result<Repository, ScaError> {
        self.state
            .lock()
            .await
            .repositories
            .get(&id)
            .cloned()
            .ok_or_else(|| ScaError::not_found("repository", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GitCommit, RepositoryRef, TaskType};
    use crate::ports::{FixedClock, Pagination};
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use ulid::Ulid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new(Arc::new(UlidGenerator::new(Arc::new(FixedClock::new(t0())))))
    }

    fn new_task(status: TaskStatus, repo: Option<RepositoryId>) -> NewTask {
        NewTask {
            task_type: TaskType::new("analyze_commits"),
            status,
            options: json!({}),
            repository_id: repo,
        }
    }

    fn new_analysis(repo: RepositoryId, hash: &str) -> NewAnalysis {
        NewAnalysis {
            repository: RepositoryRef {
                id: repo,
                name: "demo".into(),
            },
            git_commit: GitCommit {
                hash: hash.into(),
                message: "msg".into(),
                created_at: t0(),
            },
            task_id: TaskId::from_ulid(Ulid::new()),
        }
    }

    #[tokio::test]
    async fn list_filters_sorts_and_paginates() {
        let store = store();
        let mut approved = Vec::new();
        for i in 0..5 {
            let id = TaskStore::insert(
                &store,
                new_task(TaskStatus::Approved, None),
                t0() + Duration::seconds(i),
            )
            .await
            .unwrap();
            approved.push(id);
        }
        TaskStore::insert(&store, new_task(TaskStatus::WaitingForApproval, None), t0())
            .await
            .unwrap();

        let page = store
            .list(&TaskQuery {
                statuses: vec![TaskStatus::Approved],
                pagination: Pagination { page: 1, limit: 2 },
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 5);
        let ids: Vec<TaskId> = page.items.iter().map(|t| t.id).collect();
        assert_eq!(ids, approved[2..4].to_vec());

        let desc = store
            .list(&TaskQuery {
                statuses: vec![TaskStatus::Approved],
                order: SortOrder::Desc,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(desc.items[0].id, approved[4]);
    }

    #[tokio::test]
    async fn delete_updated_before_spares_kept_status() {
        let store = store();
        let old = TaskStore::insert(&store, new_task(TaskStatus::Completed, None), t0())
            .await
            .unwrap();
        let waiting =
            TaskStore::insert(&store, new_task(TaskStatus::WaitingForApproval, None), t0())
                .await
                .unwrap();
        let fresh = TaskStore::insert(
            &store,
            new_task(TaskStatus::Failed, None),
            t0() + Duration::days(3),
        )
        .await
        .unwrap();

        let deleted = store
            .delete_updated_before(t0() + Duration::days(1), TaskStatus::WaitingForApproval)
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert!(TaskStore::get(&store, old).await.unwrap().is_none());
        assert!(TaskStore::get(&store, waiting).await.unwrap().is_some());
        assert!(TaskStore::get(&store, fresh).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_missing_documents_is_not_found() {
        let store = store();
        let err = TaskStore::delete(&store, TaskId::from_ulid(Ulid::new()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = AnalysisStore::delete(&store, AnalysisId::from_ulid(Ulid::new()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn repetitive_groups_only_count_completed() {
        let store = store();
        let repo = RepositoryId::from_ulid(Ulid::new());

        for hash in ["aaa", "aaa", "bbb"] {
            let id = AnalysisStore::insert(&store, new_analysis(repo, hash), t0())
                .await
                .unwrap();
            let mut a = AnalysisStore::get(&store, id).await.unwrap().unwrap();
            a.status = StatusStamp::new(AnalysisStatus::Completed, t0());
            AnalysisStore::upsert(&store, a).await.unwrap();
        }
        // pending duplicate of "bbb" does not make it repetitive
        AnalysisStore::insert(&store, new_analysis(repo, "bbb"), t0())
            .await
            .unwrap();

        let groups = store.repetitive_groups().await.unwrap();
        assert_eq!(
            groups,
            vec![RepetitiveGroup {
                repository_id: repo,
                git_commit: "aaa".into()
            }]
        );
    }

    #[tokio::test]
    async fn mark_repository_for_deletion_touches_only_that_repository() {
        let store = store();
        let repo = RepositoryId::from_ulid(Ulid::new());
        let other = RepositoryId::from_ulid(Ulid::new());
        AnalysisStore::insert(&store, new_analysis(repo, "a"), t0())
            .await
            .unwrap();
        let kept = AnalysisStore::insert(&store, new_analysis(other, "a"), t0())
            .await
            .unwrap();

        let n = store
            .mark_repository_for_deletion(repo, t0() + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(n, 1);
        let kept = AnalysisStore::get(&store, kept).await.unwrap().unwrap();
        assert_eq!(kept.status.kind, AnalysisStatus::Pending);
    }

    #[tokio::test]
    async fn bulk_insert_is_chunked() {
        let store = store();
        let analysis_id = AnalysisId::from_ulid(Ulid::new());
        let docs: Vec<ResultDocument> = (0..250)
            .map(|i| ResultDocument {
                index: "idx".into(),
                data: json!({ "n": i, "analysis": { "analysisId": analysis_id } }),
            })
            .collect();

        store.insert_bulk(docs, 100).await.unwrap();
        assert_eq!(store.results().await.len(), 250);

        let removed = store.delete_by_analysis(analysis_id).await.unwrap();
        assert_eq!(removed, 250);
    }

    #[tokio::test]
    async fn unknown_repository_is_not_found() {
        let store = store();
        let err = store
            .get_repository(RepositoryId::from_ulid(Ulid::new()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
