//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **LocalArtifactStore**: ローカルディレクトリ上の ArtifactStore
//! - **ReqwestFetcher**: HTTP(S) の RemoteFetcher（本番用）
//! - **StaticFetcher**: メモリ上の RemoteFetcher（開発・テスト用）

pub mod local_store;
pub mod reqwest_fetcher;
pub mod static_fetcher;

// 主要な型を再エクスポート
pub use self::local_store::LocalArtifactStore;
pub use self::reqwest_fetcher::ReqwestFetcher;
pub use self::static_fetcher::{StaticFetcher, StaticResponse};
