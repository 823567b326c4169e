//! ReqwestFetcher - HTTP(S) で画像を取得する本番用 RemoteFetcher
//!
//! # タイムアウト
//! - 接続とレスポンスヘッダまでは `timeout` で打ち切る
//! - ボディは読み取り 1 回ごとの idle タイムアウト（フレームを受け取るたびにリセット）
//!
//! ボディは writer が順番に 1 本ずつ読むので、キューで待っている間は
//! ポーリングされない。その待ち時間はタイムアウトに含めない。

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;

use crate::domain::{ByteStream, FetchError};
use crate::ports::RemoteFetcher;

pub struct ReqwestFetcher {
    client: Client,
    timeout: Duration,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .user_agent(concat!("imgpack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl RemoteFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Transport("timed out waiting for response headers".into()))?
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes_stream()
            .map_err(|e| FetchError::Body(e.to_string()));
        Ok(Box::pin(body))
    }
}
