//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **FetchOrchestrator**: URL ごとの fetch を並行実行し、結果をチャネルに流す
//! - **ArchiveBuilder**: チャネルを drain して ZIP を組み立てる単一 writer
//! - **BundlePipeline**: 1 バッチ分のワイヤリング（fetch → ZIP → 永続化 → locator）
//! - **GCLoop**: 期限切れ artifact の定期削除
//! - **Settings / RetryPolicy**: 起動時に渡す設定値

pub mod archive_builder;
pub mod gc_loop;
pub mod orchestrator;
pub mod pipeline;
pub mod retry;
pub mod settings;

// 主要な型を再エクスポート
pub use self::archive_builder::{ArchiveBuilder, BuiltArchive, FailedEntry};
pub use self::gc_loop::{CLOCK_SKEW_GRACE, GCLoop, GcHandle, SweepReport};
pub use self::orchestrator::{FetchOrchestrator, FetchSummary};
pub use self::pipeline::{Bundle, BundlePipeline};
pub use self::retry::RetryPolicy;
pub use self::settings::Settings;
