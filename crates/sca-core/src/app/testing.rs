//! Test doubles shared by the app-layer tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use crate::domain::{AnalysisId, ResultDocument, ScaError};
use crate::impls::InMemoryStore;
use crate::ports::{
    BuildRequest, BuildResult, BuildRunner, FixedClock, ResultStore, UlidGenerator,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(t0()))
}

pub fn store_with_clock(clock: Arc<FixedClock>) -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new(Arc::new(UlidGenerator::new(clock))))
}

/// Build runner answering per target with canned envelopes and recording every request.
#[derive(Default)]
pub struct FakeBuildRunner {
    responses: Mutex<HashMap<String, BuildResult>>,
    calls: Mutex<Vec<BuildRequest>>,
}

impl FakeBuildRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, target: &str, result: BuildResult) {
        self.responses
            .lock()
            .unwrap()
            .insert(target.to_string(), result);
    }

    pub fn respond_ok(&self, target: &str, data: serde_json::Value) {
        self.respond(
            target,
            BuildResult {
                success: true,
                stdout: format!("{target} ok"),
                stderr: String::new(),
                result_data: Some(data),
            },
        );
    }

    pub fn calls(&self) -> Vec<BuildRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildRunner for FakeBuildRunner {
    async fn run(&self, request: &BuildRequest) -> Result<BuildResult, ScaError> {
        self.calls.lock().unwrap().push(request.clone());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&request.target)
            .cloned()
            .unwrap_or_else(|| BuildResult::failure("", format!("no target {}", request.target))))
    }
}

/// Result store that rejects every batch, and optionally every delete.
#[derive(Default)]
pub struct FailingResultStore {
    fail_deletes: bool,
}

impl FailingResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_deletes() -> Self {
        Self { fail_deletes: true }
    }
}

#[async_trait]
impl ResultStore for FailingResultStore {
    async fn insert_batch(&self, _batch: Vec<ResultDocument>) -> Result<(), ScaError> {
        Err(ScaError::Store("bulk insert rejected".into()))
    }

    async fn delete_by_analysis(&self, _analysis_id: AnalysisId) -> Result<usize, ScaError> {
        if self.fail_deletes {
            return Err(ScaError::Store("delete by query rejected".into()));
        }
        Ok(0)
    }
}

/// Delegates to the in-memory store but refuses to delete the results of chosen analyses.
pub struct DeleteRejectingResultStore {
    inner: Arc<InMemoryStore>,
    rejected: Mutex<HashSet<AnalysisId>>,
}

impl DeleteRejectingResultStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            rejected: Mutex::new(HashSet::new()),
        }
    }

    pub fn reject(&self, id: AnalysisId) {
        self.rejected.lock().unwrap().insert(id);
    }
}

#[async_trait]
impl ResultStore for DeleteRejectingResultStore {
    async fn insert_batch(&self, batch: Vec<ResultDocument>) -> Result<(), ScaError> {
        self.inner.insert_batch(batch).await
    }

    async fn delete_by_analysis(&self, analysis_id: AnalysisId) -> Result<usize, ScaError> {
        let rejected = self.rejected.lock().unwrap().contains(&analysis_id);
        if rejected {
            return Err(ScaError::Store(format!("cannot delete results of {analysis_id}")));
        }
        self.inner.delete_by_analysis(analysis_id).await
    }
}

pub fn latest_commit_json(hash: &str) -> serde_json::Value {
    json!({ "hash": hash, "message": "latest", "createdAt": "2023-03-03T03:03:03Z" })
}

pub fn analysis_output_json() -> serde_json::Value {
    json!([
        { "index": "public_sca_analysis_result_files", "data": { "path": "src/main.rs", "lines": 10 } },
        { "index": "public_sca_analysis_result_dependencies", "data": { "name": "serde" } }
    ])
}
