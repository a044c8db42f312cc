//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（文書ストア、ビルドパイプライン、リポジトリ定義）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - 文書ストアが source of truth（正本）
//! - トランザクションは無い。複数ステップの整合性は app 層の補償処理で保つ
//! - ビルドは外部プロセス。結果は JSON エンベロープとしてだけ扱う

pub mod analysis_store;
pub mod build_runner;
pub mod clock;
pub mod id_generator;
pub mod repository_catalog;
pub mod task_store;

pub use self::analysis_store::{
    AnalysisQuery, AnalysisStore, DEFAULT_BULK_CHUNK_SIZE, RepetitiveGroup, ResultStore,
};
pub use self::build_runner::{BuildRequest, BuildResult, BuildRunner};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::repository_catalog::RepositoryCatalog;
pub use self::task_store::{Page, Pagination, SortOrder, TaskQuery, TaskStore};
