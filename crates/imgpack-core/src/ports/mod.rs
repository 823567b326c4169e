//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部システム（HTTP オリジン、ファイルシステム、時計）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - artifact の名前空間は ArtifactStore だけが触る
//! - 時刻と ID は Clock / IdGenerator から取る（テストで差し替え可能）

pub mod artifact_store;
pub mod clock;
pub mod fetcher;
pub mod id_generator;

// 主要な trait を再エクスポート
pub use self::artifact_store::{ArtifactStore, Container};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::fetcher::RemoteFetcher;
pub use self::id_generator::{IdGenerator, UlidGenerator};
