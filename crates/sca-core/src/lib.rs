//! sca-core
//!
//! Core building blocks for the source-code analysis task runner.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, status, task, analysis, repository, outcome, sampling, errors）
//! - **ports**: 抽象化レイヤー（TaskStore, AnalysisStore, ResultStore, RepositoryCatalog, BuildRunner, Clock）
//! - **app**: アプリケーションロジック（builder, executor, handlers, maintenance, commands）
//! - **typed**: 型付き Task API（Task trait, Handler trait, TypedRegistry, PayloadCodec）
//! - **impls**: 実装（InMemoryStore, EarthlyRunner）
//! - **config**: TOML + 環境変数による設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;
