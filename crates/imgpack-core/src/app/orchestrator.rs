//! FetchOrchestrator - URL ごとの fetch を並行に走らせて結果を集める
//!
//! # フロー
//! 1. URL ごとに JoinSet へタスクを spawn（Semaphore で同時実行数を制限）
//! 2. 各タスクは必ず FetchOutcome に解決する（エラーを投げない）
//! 3. 結果は mpsc チャネル（append-only）で ArchiveBuilder に流す
//! 4. 全タスクの完了を待ってから返る（最初の成功で早期 return しない）
//!
//! # 並行数の上限
//! 成功した fetch の permit はバイトストリームに付いていき、
//! ArchiveBuilder がストリームを drop した時点で解放されます。
//! 上限は「同時に開いている接続数」に効きます。

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::domain::entry::infer_extension;
use crate::domain::{ByteStream, FetchError, FetchOutcome, FetchRequest, FetchedImage};
use crate::ports::RemoteFetcher;

use super::retry::RetryPolicy;

/// Per-batch tally returned after the join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct FetchOrchestrator {
    fetcher: Arc<dyn RemoteFetcher>,
    concurrency: usize,
    retry: RetryPolicy,
}

impl FetchOrchestrator {
    pub fn new(fetcher: Arc<dyn RemoteFetcher>, concurrency: usize, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
            retry,
        }
    }

    /// Fetch every URL of `request`, sending each outcome to `results` as it resolves.
    ///
    /// Returns once every task has resolved. `results` is dropped on return,
    /// which closes the channel for the receiver.
    pub async fn run(
        &self,
        request: &FetchRequest,
        results: mpsc::Sender<FetchOutcome>,
    ) -> FetchSummary {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, url) in request.urls().iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let permits = Arc::clone(&permits);
            let results = results.clone();
            let retry = self.retry.clone();
            let url = url.clone();

            tasks.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(permit) => fetch_one(fetcher.as_ref(), index, url, &retry, permit).await,
                    Err(_) => FetchOutcome::Failure {
                        index,
                        url,
                        reason: FetchError::Transport("fetch pool closed".into()),
                        attempts: 0,
                    },
                };

                let succeeded = outcome.is_success();
                if let Err(mpsc::error::SendError(outcome)) = results.send(outcome).await {
                    // writer 側が先に終了した（書き込みエラー）。結果はもう使われない
                    debug!(
                        index = outcome.index(),
                        url = outcome.url(),
                        "archive writer gone, dropping outcome"
                    );
                }
                succeeded
            });
        }
        drop(results);

        let mut summary = FetchSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => summary.succeeded += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    error!(error = %e, "fetch task did not complete");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

async fn fetch_one(
    fetcher: &dyn RemoteFetcher,
    index: usize,
    url: String,
    retry: &RetryPolicy,
    permit: OwnedSemaphorePermit,
) -> FetchOutcome {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match fetcher.fetch(&url).await {
            Ok(body) => {
                debug!(index, url = %url, attempts, "fetched");
                let image = FetchedImage::new(infer_extension(&url), hold_permit(body, permit));
                return FetchOutcome::Success { index, url, image };
            }
            Err(reason) if retry.should_retry(attempts, &reason) => {
                let delay = retry.next_delay(attempts);
                warn!(index, url = %url, attempts, error = %reason, ?delay, "fetch failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(reason) => {
                warn!(index, url = %url, attempts, error = %reason, "fetch failed");
                return FetchOutcome::Failure {
                    index,
                    url,
                    reason,
                    attempts,
                };
            }
        }
    }
}

/// Tie the permit's lifetime to the body: released when the stream is dropped.
fn hold_permit(body: ByteStream, permit: OwnedSemaphorePermit) -> ByteStream {
    Box::pin(body.map(move |chunk| {
        let _held = &permit;
        chunk
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::StaticFetcher;
    use std::time::Duration;

    fn request(urls: &[&str]) -> FetchRequest {
        FetchRequest::new(urls.iter().map(|u| u.to_string()).collect()).unwrap()
    }

    async fn drain(mut rx: mpsc::Receiver<FetchOutcome>) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Drops each body on receipt so its permit goes back to the pool.
    async fn drain_indices(mut rx: mpsc::Receiver<FetchOutcome>) -> Vec<usize> {
        let mut order = Vec::new();
        while let Some(outcome) = rx.recv().await {
            order.push(outcome.index());
        }
        order
    }

    #[tokio::test]
    async fn collects_one_outcome_per_url() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_body("https://x/a.jpg", "a")
                .with_error("https://x/b.png", FetchError::Status(404)),
        );
        let orchestrator = FetchOrchestrator::new(fetcher, 4, RetryPolicy::no_retry());
        let (tx, rx) = mpsc::channel(8);
        let collector = tokio::spawn(drain(rx));

        let summary = orchestrator
            .run(&request(&["https://x/a.jpg", "https://x/b.png", "https://x/c.gif"]), tx)
            .await;

        assert_eq!(summary, FetchSummary { succeeded: 1, failed: 2 });

        let mut outcomes = collector.await.unwrap();
        outcomes.sort_by_key(|o| o.index());
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(
            &outcomes[0],
            FetchOutcome::Success { index: 0, image, .. } if image.extension.as_deref() == Some("jpeg")
        ));
        assert!(matches!(
            &outcomes[1],
            FetchOutcome::Failure { index: 1, reason: FetchError::Status(404), attempts: 1, .. }
        ));
        assert!(matches!(
            &outcomes[2],
            FetchOutcome::Failure { index: 2, reason: FetchError::Transport(_), .. }
        ));
    }

    #[tokio::test]
    async fn all_failures_still_complete() {
        let fetcher = Arc::new(StaticFetcher::new());
        let orchestrator = FetchOrchestrator::new(fetcher, 2, RetryPolicy::no_retry());
        let (tx, rx) = mpsc::channel(8);
        let collector = tokio::spawn(drain(rx));

        let summary = orchestrator
            .run(&request(&["https://x/a", "https://x/b"]), tx)
            .await;

        assert_eq!(summary, FetchSummary { succeeded: 0, failed: 2 });
        assert_eq!(collector.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn finishes_when_the_writer_is_gone() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_body("https://x/a.png", "a")
                .with_error("https://x/b.png", FetchError::Status(500)),
        );
        let orchestrator = FetchOrchestrator::new(fetcher, 2, RetryPolicy::no_retry());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let summary = orchestrator
            .run(&request(&["https://x/a.png", "https://x/b.png"]), tx)
            .await;

        assert_eq!(summary, FetchSummary { succeeded: 1, failed: 1 });
    }

    #[tokio::test]
    async fn join_waits_for_slowest_fetch() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_body("https://x/fast.png", "f")
                .with_body("https://x/slow.png", "s")
                .with_delay("https://x/slow.png", Duration::from_millis(150)),
        );
        let orchestrator = FetchOrchestrator::new(fetcher, 4, RetryPolicy::no_retry());
        let (tx, rx) = mpsc::channel(8);
        let collector = tokio::spawn(drain_indices(rx));

        let summary = orchestrator
            .run(&request(&["https://x/slow.png", "https://x/fast.png"]), tx)
            .await;
        assert_eq!(summary.succeeded, 2);

        // 受信順は完了順（入力順ではない）
        assert_eq!(collector.await.unwrap(), vec![1, 0]);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let urls: Vec<String> = (0..12).map(|i| format!("https://x/{i}.png")).collect();
        let mut fetcher = StaticFetcher::new();
        for url in &urls {
            fetcher = fetcher
                .with_body(url, "x")
                .with_delay(url, Duration::from_millis(20));
        }
        let fetcher = Arc::new(fetcher);
        let orchestrator = FetchOrchestrator::new(fetcher.clone(), 3, RetryPolicy::no_retry());
        let (tx, rx) = mpsc::channel(32);
        let collector = tokio::spawn(drain_indices(rx));

        let summary = orchestrator
            .run(&FetchRequest::new(urls).unwrap(), tx)
            .await;

        assert_eq!(summary.succeeded, 12);
        assert!(fetcher.peak_in_flight() <= 3);
        assert_eq!(collector.await.unwrap().len(), 12);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_body("https://x/a.png", "a")
                .failing_first("https://x/a.png", 2, FetchError::Status(503))
                .with_body("https://x/b.png", "b")
                .failing_first("https://x/b.png", 1, FetchError::Status(404)),
        );
        let retry = RetryPolicy::exponential(2, Duration::from_millis(1));
        let orchestrator = FetchOrchestrator::new(fetcher.clone(), 4, retry);
        let (tx, rx) = mpsc::channel(8);
        let collector = tokio::spawn(drain(rx));

        let summary = orchestrator
            .run(&request(&["https://x/a.png", "https://x/b.png"]), tx)
            .await;

        assert_eq!(summary, FetchSummary { succeeded: 1, failed: 1 });
        assert_eq!(fetcher.calls("https://x/a.png"), 3);
        // 404 は恒久的なのでリトライしない
        assert_eq!(fetcher.calls("https://x/b.png"), 1);
        assert_eq!(collector.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn permit_is_released_when_body_is_dropped() {
        let permits = Arc::new(Semaphore::new(1));
        let permit = Arc::clone(&permits).acquire_owned().await.unwrap();
        let body: ByteStream = Box::pin(futures::stream::empty::<Result<bytes::Bytes, FetchError>>());

        let held = hold_permit(body, permit);
        assert_eq!(permits.available_permits(), 0);
        drop(held);
        assert_eq!(permits.available_permits(), 1);
    }
}
