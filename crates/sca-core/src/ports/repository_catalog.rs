//! RepositoryCatalog port - リポジトリ定義（CRUD 層が所有）の読み取り口

use async_trait::async_trait;

use crate::domain::{Repository, RepositoryId, ScaError};

#[async_trait]
pub trait RepositoryCatalog: Send + Sync {
    /// Fails with `NotFound` when the repository is absent.
    async fn get_repository(&self, id: RepositoryId) -> Result<Repository, ScaError>;
}
