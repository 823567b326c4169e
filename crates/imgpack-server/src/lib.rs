//! imgpack-server
//!
//! imgpack-core の薄い HTTP 表面。
//!
//! # モジュール構成
//! - **config**: clap の引数 / 環境変数 → Settings
//! - **logging**: tracing-subscriber の初期化
//! - **validate**: リクエストボディの検証
//! - **routes**: axum ルーター（作成・ダウンロード）
//! - **error**: ApiError → HTTP レスポンス

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod validate;

pub use self::routes::{AppState, router};
