//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryStore**: 開発用・テスト用の文書ストア（全ストア port を実装）
//! - **EarthlyRunner**: Earthly を呼び出す BuildRunner

pub mod earthly;
pub mod inmem_store;

pub use self::earthly::EarthlyRunner;
pub use self::inmem_store::InMemoryStore;
