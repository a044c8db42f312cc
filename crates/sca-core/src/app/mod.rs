//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: ハンドラ登録とワイヤリング
//! - **TaskCommands / AnalysisCommands**: ステータス遷移を守るストア操作
//! - **BuildCommands**: Earthly ターゲットの型付き呼び出し
//! - **MonoTaskExecutor**: 承認済みタスクを 1 件ずつ実行するポーリングループ
//! - **MaintenanceSweeps**: 滞留・重複解析と古いタスクの回収

pub mod analysis_commands;
pub mod build_commands;
pub mod builder;
pub mod dispatcher;
pub mod executor;
pub mod handlers;
pub mod maintenance;
pub mod scheduler;
pub mod task_commands;

#[cfg(test)]
mod testing;

// 主要な型を再エクスポート
pub use self::analysis_commands::{AnalysisCommands, CascadeReport};
pub use self::build_commands::BuildCommands;
pub use self::builder::{App, AppBuilder, BuildError, DEFAULT_TASK_TYPES, RunningApp, Services};
pub use self::dispatcher::TaskDispatcher;
pub use self::executor::{CycleReport, MonoTaskExecutor};
pub use self::maintenance::{MaintenanceSweeps, SweepReport};
pub use self::scheduler::PeriodicJob;
pub use self::task_commands::{StatusUpdate, TaskCommands};
