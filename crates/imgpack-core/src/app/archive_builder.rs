//! ArchiveBuilder - 単一 writer による ZIP 組み立て
//!
//! # 設計原則
//! - ZIP は並行書き込みできないので writer は 1 つだけ
//! - 結果チャネルを 1 本の専用スレッド（spawn_blocking）が drain する
//! - エントリは受信順に 1 つずつ追加（入力順ではない）
//! - 画像全体をメモリに溜めず、チャンク単位でストリームから ZIP へ中継する
//!
//! # フロー
//! 1. `recv()` で FetchOutcome を受け取る
//! 2. Success → `image-<ts>-<index>.<ext>` でエントリ開始、チャンクを中継
//! 3. Failure → 記録のみ
//! 4. チャネルが閉じたら、1 件以上書けていれば central directory を書いて閉じる
//!
//! 0 件なら `ArchiveError::EmptyBatch`（空の ZIP は作らない）。

use std::io::{Seek, Write};

use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domain::{ArchiveError, ByteStream, EntryName, FetchError, FetchOutcome};

/// A URL that did not make it into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    pub index: usize,
    pub url: String,
    pub reason: FetchError,
}

/// A closed container plus what went into it.
#[derive(Debug)]
pub struct BuiltArchive<W> {
    pub container: W,
    /// Entry names in the order they were written.
    pub entries: Vec<String>,
    pub failures: Vec<FailedEntry>,
}

pub struct ArchiveBuilder<W: Write + Seek> {
    zip: ZipWriter<W>,
    batch_timestamp: i64,
    options: SimpleFileOptions,
    entries: Vec<String>,
    failures: Vec<FailedEntry>,
}

impl<W: Write + Seek> ArchiveBuilder<W> {
    pub fn new(sink: W, batch_timestamp: i64) -> Self {
        Self {
            zip: ZipWriter::new(sink),
            batch_timestamp,
            options: SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(0o644),
            entries: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Consume one outcome.
    ///
    /// A body that breaks mid-entry is rolled back and recorded as a failure.
    /// Only sink-side errors are returned.
    pub fn accept(&mut self, handle: &Handle, outcome: FetchOutcome) -> Result<(), ArchiveError> {
        match outcome {
            FetchOutcome::Success { index, url, image } => {
                let name = EntryName::new(self.batch_timestamp, index, image.extension);
                match self.relay(handle, &name, image.body)? {
                    Ok(bytes) => {
                        debug!(index, entry = %name, bytes, "entry written");
                        self.entries.push(name.to_string());
                    }
                    Err(reason) => {
                        warn!(index, url = %url, error = %reason, "body failed mid-entry, entry dropped");
                        self.failures.push(FailedEntry { index, url, reason });
                    }
                }
            }
            FetchOutcome::Failure {
                index, url, reason, ..
            } => {
                self.failures.push(FailedEntry { index, url, reason });
            }
        }
        Ok(())
    }

    /// Stream `body` into a new entry. Outer error: sink. Inner error: source.
    fn relay(
        &mut self,
        handle: &Handle,
        name: &EntryName,
        mut body: ByteStream,
    ) -> Result<Result<u64, FetchError>, ArchiveError> {
        self.zip.start_file(name.to_string(), self.options)?;

        let mut written = 0u64;
        while let Some(chunk) = handle.block_on(body.next()) {
            match chunk {
                Ok(bytes) => {
                    self.zip.write_all(&bytes)?;
                    written += bytes.len() as u64;
                }
                Err(reason) => {
                    self.zip.abort_file()?;
                    return Ok(Err(reason));
                }
            }
        }
        Ok(Ok(written))
    }

    /// Write the central directory and hand back the sink.
    pub fn finish(self) -> Result<BuiltArchive<W>, ArchiveError> {
        if self.entries.is_empty() {
            return Err(ArchiveError::EmptyBatch {
                failed: self.failures.len(),
            });
        }
        let mut container = self.zip.finish()?;
        container.flush()?;
        Ok(BuiltArchive {
            container,
            entries: self.entries,
            failures: self.failures,
        })
    }

    /// Drain `results` until every sender is gone, then finish.
    ///
    /// Blocks the calling thread; `handle` drives the async receives.
    pub fn run(
        mut self,
        handle: Handle,
        mut results: mpsc::Receiver<FetchOutcome>,
    ) -> Result<BuiltArchive<W>, ArchiveError> {
        while let Some(outcome) = handle.block_on(results.recv()) {
            self.accept(&handle, outcome)?;
        }
        self.finish()
    }
}

impl<W: Write + Seek + Send + 'static> ArchiveBuilder<W> {
    /// Run the writer on its own blocking thread.
    pub fn spawn(
        self,
        results: mpsc::Receiver<FetchOutcome>,
    ) -> JoinHandle<Result<BuiltArchive<W>, ArchiveError>> {
        let handle = Handle::current();
        tokio::task::spawn_blocking(move || self.run(handle, results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FetchedImage;
    use bytes::Bytes;
    use futures::stream;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    const TS: i64 = 1_700_000_000_000;

    fn body(chunks: &[&'static str]) -> ByteStream {
        let items: Vec<Result<Bytes, FetchError>> =
            chunks.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect();
        Box::pin(stream::iter(items))
    }

    fn success(index: usize, ext: &str, body: ByteStream) -> FetchOutcome {
        FetchOutcome::Success {
            index,
            url: format!("https://x/{index}.{ext}"),
            image: FetchedImage::new(Some(ext.to_string()), body),
        }
    }

    fn failure(index: usize) -> FetchOutcome {
        FetchOutcome::Failure {
            index,
            url: format!("https://x/{index}.png"),
            reason: FetchError::Status(404),
            attempts: 1,
        }
    }

    async fn build(
        outcomes: Vec<FetchOutcome>,
    ) -> Result<BuiltArchive<Cursor<Vec<u8>>>, ArchiveError> {
        let (tx, rx) = mpsc::channel(4);
        let writer = ArchiveBuilder::new(Cursor::new(Vec::new()), TS).spawn(rx);
        for outcome in outcomes {
            tx.send(outcome).await.unwrap();
        }
        drop(tx);
        writer.await.unwrap()
    }

    fn read_entries(archive: &BuiltArchive<Cursor<Vec<u8>>>) -> Vec<(String, Vec<u8>)> {
        let mut zip = ZipArchive::new(Cursor::new(archive.container.get_ref().clone())).unwrap();
        (0..zip.len())
            .map(|i| {
                let mut file = zip.by_index(i).unwrap();
                let mut content = Vec::new();
                file.read_to_end(&mut content).unwrap();
                (file.name().to_string(), content)
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn entries_follow_receipt_order_and_index_naming() {
        let archive = build(vec![
            success(1, "png", body(&["second"])),
            failure(2),
            success(0, "jpeg", body(&["fir", "st"])),
        ])
        .await
        .unwrap();

        let entries = read_entries(&archive);
        assert_eq!(
            entries,
            vec![
                (format!("image-{TS}-1.png"), b"second".to_vec()),
                (format!("image-{TS}-0.jpeg"), b"first".to_vec()),
            ]
        );
        assert_eq!(archive.entries.len(), 2);
        assert_eq!(archive.failures.len(), 1);
        assert_eq!(archive.failures[0].index, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn broken_body_is_rolled_back() {
        let broken: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"half")),
            Err(FetchError::Body("connection reset".into())),
        ]));

        let archive = build(vec![
            success(0, "png", body(&["ok"])),
            success(1, "gif", broken),
        ])
        .await
        .unwrap();

        let entries = read_entries(&archive);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, format!("image-{TS}-0.png"));
        assert_eq!(
            archive.failures,
            vec![FailedEntry {
                index: 1,
                url: "https://x/1.gif".into(),
                reason: FetchError::Body("connection reset".into()),
            }]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn zero_entries_is_empty_batch() {
        let result = build(vec![failure(0), failure(1)]).await;
        assert!(matches!(result, Err(ArchiveError::EmptyBatch { failed: 2 })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn only_broken_bodies_is_empty_batch() {
        let broken: ByteStream = Box::pin(stream::iter(vec![Err(FetchError::Body("eof".into()))]));
        let result = build(vec![success(0, "png", broken)]).await;
        assert!(matches!(result, Err(ArchiveError::EmptyBatch { failed: 1 })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn large_body_is_relayed_in_chunks() {
        let chunk = Bytes::from(vec![7u8; 64 * 1024]);
        let chunks: Vec<Result<Bytes, FetchError>> = (0..32).map(|_| Ok(chunk.clone())).collect();
        let archive = build(vec![success(0, "bin", Box::pin(stream::iter(chunks)))])
            .await
            .unwrap();

        let entries = read_entries(&archive);
        assert_eq!(entries[0].1.len(), 32 * 64 * 1024);
        assert!(entries[0].1.iter().all(|b| *b == 7));
    }
}
