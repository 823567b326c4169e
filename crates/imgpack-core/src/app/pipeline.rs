//! BundlePipeline - 1 バッチ分の fetch → ZIP → 永続化
//!
//! # フロー
//! 1. BatchId とバッチのタイムスタンプを決める
//! 2. ステージング領域にコンテナを作り、ArchiveBuilder を専用スレッドで起動
//! 3. FetchOrchestrator が結果をチャネルに流す（全 URL の完了を待つ）
//! 4. writer の Result を join → 1 件以上あれば store で finalize
//! 5. Artifact を ArtifactLocator に変換して返す
//!
//! 全件失敗のときはコンテナが drop されるだけで、ID は割り当てられません。

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{Instrument, info, info_span, warn};
use url::Url;

use crate::domain::{
    ArchiveError, Artifact, ArtifactLocator, FetchRequest, PipelineError,
};
use crate::ports::{ArtifactStore, Clock, IdGenerator, RemoteFetcher, UlidGenerator};

use super::archive_builder::{ArchiveBuilder, FailedEntry};
use super::orchestrator::FetchOrchestrator;
use super::settings::Settings;

/// Outcomes buffered between the fetch tasks and the writer.
const RESULT_CHANNEL_CAPACITY: usize = 64;

/// A persisted batch.
#[derive(Debug)]
pub struct Bundle {
    pub artifact: Artifact,
    pub locator: ArtifactLocator,
    /// Entry names in archive order.
    pub entries: Vec<String>,
    pub failures: Vec<FailedEntry>,
}

pub struct BundlePipeline {
    orchestrator: FetchOrchestrator,
    store: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    public_base: Url,
}

impl BundlePipeline {
    pub fn new(
        fetcher: Arc<dyn RemoteFetcher>,
        store: Arc<dyn ArtifactStore>,
        clock: Arc<dyn Clock>,
        settings: &Settings,
        public_base: Url,
    ) -> Self {
        Self {
            orchestrator: FetchOrchestrator::new(
                fetcher,
                settings.fetch_concurrency,
                settings.retry.clone(),
            ),
            store,
            ids: Arc::new(UlidGenerator::new(Arc::clone(&clock))),
            clock,
            public_base,
        }
    }

    /// Fetch, archive and persist one batch.
    ///
    /// # Errors
    /// - `EmptyBatch` when no URL produced an entry
    /// - `Persistence` when writing or storing the archive failed
    pub async fn create_bundle(&self, request: FetchRequest) -> Result<Bundle, PipelineError> {
        let batch = self.ids.generate_batch_id();
        let batch_timestamp = self.clock.now().timestamp_millis();
        let span = info_span!("batch", batch = %batch, urls = request.len());

        async move {
            let container = self.store.create_container()?;
            let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
            let writer = ArchiveBuilder::new(container, batch_timestamp).spawn(rx);

            let summary = self.orchestrator.run(&request, tx).await;

            let built = match writer.await {
                Ok(result) => result,
                Err(e) => Err(ArchiveError::Relay(e.to_string())),
            };
            let built = match built {
                Ok(built) => built,
                Err(ArchiveError::EmptyBatch { failed }) => {
                    warn!(failed, "no image could be fetched");
                    return Err(PipelineError::EmptyBatch { failed });
                }
                Err(e) => return Err(e.into()),
            };

            let artifact = self.store.finalize(built.container).await?;
            let locator = ArtifactLocator::new(&self.public_base, &artifact)
                .map_err(|e| PipelineError::Persistence(e.to_string()))?;

            info!(
                artifact = %artifact.id,
                entries = built.entries.len(),
                failed = built.failures.len(),
                fetched = summary.succeeded,
                expires = %artifact.expires_at,
                "bundle created"
            );

            Ok(Bundle {
                artifact,
                locator,
                entries: built.entries,
                failures: built.failures,
            })
        }
        .instrument(span)
        .await
    }
}
