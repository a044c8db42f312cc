//! Analysis documents, git commit metadata and analysis result records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AnalysisId, RepositoryId, TaskId};
use super::status::{AnalysisStatus, StatusStamp};

/// A commit as reported by the git tooling inside the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GitCommit {
    pub hash: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub id: RepositoryId,
    pub name: String,
}

/// One static-analysis run of a repository at a specific commit.
///
/// `task_id` is a back-reference only; the analysis usually outlives its task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: AnalysisId,
    pub repository: RepositoryRef,
    pub git_commit: GitCommit,
    pub task_id: TaskId,
    pub status: StatusStamp<AnalysisStatus>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalysis {
    pub repository: RepositoryRef,
    pub git_commit: GitCommit,
    pub task_id: TaskId,
}

/// One `(index, document)` pair produced by the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultRecord {
    pub index: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// A result record ready for ingestion, stamped with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    pub index: String,
    pub data: serde_json::Value,
}

impl ResultDocument {
    /// Stamps a pipeline record with repository/commit info and the
    /// `{analysisId, taskId}` back-reference.
    pub fn stamped(
        record: ResultRecord,
        repository_name: &str,
        git_ref: &str,
        commit_date: DateTime<Utc>,
        analysis_id: AnalysisId,
        task_id: TaskId,
    ) -> Self {
        let mut data = record.data;
        data.insert(
            "repository".to_string(),
            serde_json::json!({
                "name": repository_name,
                "gitCommit": git_ref,
                "date": commit_date.to_rfc3339(),
            }),
        );
        data.insert(
            "analysis".to_string(),
            serde_json::json!({
                "analysisId": analysis_id,
                "taskId": task_id,
            }),
        );
        Self {
            index: record.index,
            data: serde_json::Value::Object(data),
        }
    }

    /// The analysis this document belongs to, if stamped.
    pub fn analysis_id(&self) -> Option<AnalysisId> {
        self.data
            .get("analysis")?
            .get("analysisId")?
            .as_str()?
            .parse()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ulid::Ulid;

    #[test]
    fn stamped_document_references_analysis_and_task() {
        let analysis_id = AnalysisId::from_ulid(Ulid::new());
        let task_id = TaskId::from_ulid(Ulid::new());
        let record: ResultRecord = serde_json::from_value(json!({
            "index": "public_sca_analysis_result_repositories",
            "data": { "files": 12 }
        }))
        .unwrap();

        let doc = ResultDocument::stamped(
            record,
            "demo",
            "abc123",
            "2021-03-04T05:06:07Z".parse().unwrap(),
            analysis_id,
            task_id,
        );

        assert_eq!(doc.data["files"], 12);
        assert_eq!(doc.data["repository"]["name"], "demo");
        assert_eq!(doc.data["repository"]["gitCommit"], "abc123");
        assert_eq!(doc.data["analysis"]["taskId"], json!(task_id));
        assert_eq!(doc.analysis_id(), Some(analysis_id));
    }

    #[test]
    fn result_record_rejects_non_object_data() {
        let res = serde_json::from_value::<ResultRecord>(json!({ "index": "x", "data": 3 }));
        assert!(res.is_err());

        let res = serde_json::from_value::<ResultRecord>(
            json!({ "index": "x", "data": {}, "extra": true }),
        );
        assert!(res.is_err());
    }

    #[test]
    fn git_commit_is_strict() {
        let ok = serde_json::from_value::<GitCommit>(json!({
            "hash": "a", "message": "m", "createdAt": "2020-01-01T00:00:00Z"
        }));
        assert!(ok.is_ok());

        let extra = serde_json::from_value::<GitCommit>(json!({
            "hash": "a", "message": "m", "createdAt": "2020-01-01T00:00:00Z", "author": "x"
        }));
        assert!(extra.is_err());
    }
}
