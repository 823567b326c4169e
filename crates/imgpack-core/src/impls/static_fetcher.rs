//! StaticFetcher - 開発・テスト用の RemoteFetcher
//!
//! # 学習ポイント
//! - ネットワークなしでパイプライン全体を動かす
//! - 遅延・途中切断・一時的失敗を URL ごとに仕込める
//! - 同時実行数のピークを記録する（並行数上限の検証用）

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use crate::domain::{ByteStream, FetchError};
use crate::ports::RemoteFetcher;

/// What a route answers with.
#[derive(Debug, Clone)]
pub enum StaticResponse {
    Body(Vec<Bytes>),
    Error(FetchError),
    /// Headers succeed, then the body breaks after `chunks`.
    Truncated { chunks: Vec<Bytes>, error: FetchError },
}

#[derive(Debug, Clone)]
struct Route {
    response: StaticResponse,
    delay: Duration,
    failures_left: u32,
    failure: Option<FetchError>,
}

/// StaticFetcher は URL → 応答の表を引くだけ
///
/// # 使用例
/// ```ignore
/// let fetcher = StaticFetcher::new()
///     .with_body("https://x/a.jpg", "jpeg bytes")
///     .with_error("https://x/b.png", FetchError::Status(404))
///     .with_delay("https://x/a.jpg", Duration::from_millis(50));
/// ```
#[derive(Debug, Default)]
pub struct StaticFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(self, url: &str, response: StaticResponse) -> Self {
        self.lock_routes().insert(
            url.to_string(),
            Route {
                response,
                delay: Duration::ZERO,
                failures_left: 0,
                failure: None,
            },
        );
        self
    }

    pub fn with_body(self, url: &str, body: impl Into<Bytes>) -> Self {
        self.route(url, StaticResponse::Body(vec![body.into()]))
    }

    pub fn with_chunks(self, url: &str, chunks: Vec<Bytes>) -> Self {
        self.route(url, StaticResponse::Body(chunks))
    }

    pub fn with_error(self, url: &str, error: FetchError) -> Self {
        self.route(url, StaticResponse::Error(error))
    }

    pub fn with_truncated_body(self, url: &str, chunks: Vec<Bytes>, error: FetchError) -> Self {
        self.route(url, StaticResponse::Truncated { chunks, error })
    }

    /// Wait `delay` before answering. The route must already exist.
    pub fn with_delay(self, url: &str, delay: Duration) -> Self {
        if let Some(route) = self.lock_routes().get_mut(url) {
            route.delay = delay;
        }
        self
    }

    /// Answer the first `times` calls with `error`, then the configured response.
    pub fn failing_first(self, url: &str, times: u32, error: FetchError) -> Self {
        if let Some(route) = self.lock_routes().get_mut(url) {
            route.failures_left = times;
            route.failure = Some(error);
        }
        self
    }

    pub fn calls(&self, url: &str) -> u32 {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of `fetch` calls that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn lock_routes(&self) -> std::sync::MutexGuard<'_, HashMap<String, Route>> {
        self.routes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Pick the answer for this call, consuming one scripted failure if any.
    fn next_answer(&self, url: &str) -> Option<(Duration, Result<StaticResponse, FetchError>)> {
        *self
            .calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(url.to_string())
            .or_default() += 1;

        let mut routes = self.lock_routes();
        let route = routes.get_mut(url)?;
        if route.failures_left > 0
            && let Some(failure) = route.failure.clone()
        {
            route.failures_left -= 1;
            return Some((route.delay, Err(failure)));
        }
        Some((route.delay, Ok(route.response.clone())))
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let Some((delay, answer)) = self.next_answer(url) else {
            return Err(FetchError::Transport(format!("no route to {url}")));
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match answer? {
            StaticResponse::Body(chunks) => {
                let items = chunks.into_iter().map(Ok::<Bytes, FetchError>);
                Ok(Box::pin(stream::iter(items)))
            }
            StaticResponse::Error(error) => Err(error),
            StaticResponse::Truncated { chunks, error } => {
                let items = chunks
                    .into_iter()
                    .map(Ok::<Bytes, FetchError>)
                    .chain(std::iter::once(Err(error)));
                Ok(Box::pin(stream::iter(items)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn collect(body: ByteStream) -> Result<Vec<u8>, FetchError> {
        let chunks: Vec<Bytes> = body.try_collect().await?;
        Ok(chunks.concat())
    }

    #[tokio::test]
    async fn answers_configured_routes() {
        let fetcher = StaticFetcher::new()
            .with_chunks("https://x/a.png", vec![Bytes::from("ab"), Bytes::from("cd")])
            .with_error("https://x/b.png", FetchError::Status(404));

        let body = fetcher.fetch("https://x/a.png").await.unwrap();
        assert_eq!(collect(body).await.unwrap(), b"abcd");

        assert_eq!(
            fetcher.fetch("https://x/b.png").await.err(),
            Some(FetchError::Status(404))
        );
        assert!(matches!(
            fetcher.fetch("https://x/unknown").await.err(),
            Some(FetchError::Transport(_))
        ));
        assert_eq!(fetcher.calls("https://x/a.png"), 1);
    }

    #[tokio::test]
    async fn truncated_body_errors_after_chunks() {
        let fetcher = StaticFetcher::new().with_truncated_body(
            "https://x/a.png",
            vec![Bytes::from("ab")],
            FetchError::Body("reset".into()),
        );

        let body = fetcher.fetch("https://x/a.png").await.unwrap();
        assert_eq!(collect(body).await, Err(FetchError::Body("reset".into())));
    }

    #[tokio::test]
    async fn failing_first_then_recovers() {
        let fetcher = StaticFetcher::new()
            .with_body("https://x/a.png", "ok")
            .failing_first("https://x/a.png", 2, FetchError::Status(503));

        assert!(fetcher.fetch("https://x/a.png").await.is_err());
        assert!(fetcher.fetch("https://x/a.png").await.is_err());
        assert!(fetcher.fetch("https://x/a.png").await.is_ok());
        assert_eq!(fetcher.calls("https://x/a.png"), 3);
    }
}
