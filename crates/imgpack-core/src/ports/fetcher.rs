//! RemoteFetcher port - 1 URL をバイトストリームとして取得
//!
//! # 実装
//! - **ReqwestFetcher**: HTTP(S)（本番用）
//! - **StaticFetcher**: メモリ上の応答（開発・テスト用）

use async_trait::async_trait;

use crate::domain::{ByteStream, FetchError};

/// RemoteFetcher は URL ごとに独立して呼ばれる
///
/// # 設計原則
/// - レスポンスヘッダが成功を示した時点で `Ok(stream)` を返す（本体はまだ読まない）
/// - 非成功ステータスは `FetchError::Status`
/// - タイムアウトは実装側（HTTP クライアント）の責務
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError>;
}
