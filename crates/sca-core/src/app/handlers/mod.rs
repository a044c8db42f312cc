//! Task handlers, one module per task type.

pub mod analyze_commits;
pub mod analyze_repository;

pub use self::analyze_commits::{AnalyzeCommitsHandler, AnalyzeCommitsTask};
pub use self::analyze_repository::{AnalyzeRepositoryHandler, AnalyzeRepositoryTask};
