//! Errors - エラー型と分類
//!
//! 失敗は並行ドメインの境界を「例外」として越えません。
//! - fetch タスク: `FetchError` を `FetchOutcome::Failure` に変換して送る
//! - archive writer: `ArchiveError` を `Result` として join 側に返す
//! - GC: 削除失敗は `SweepReport` に記録するだけ
//!
//! 呼び出し元に見えるのは `PipelineError` だけです。

use std::io;

use super::ids::ArtifactId;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 一時的なエラー（リトライ推奨）
/// - Permanent: 恒久的なエラー（リトライ無意味）
/// - Infrastructure: インフラエラー（ディスクなど）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// One URL could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// The origin answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The response body failed while it was being relayed.
    #[error("body error: {0}")]
    Body(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Transport(_) | FetchError::Body(_) => ErrorKind::Transient,
            FetchError::Status(status) if *status == 429 || *status >= 500 => {
                ErrorKind::Transient
            }
            FetchError::Status(_) => ErrorKind::Permanent,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// 1 件も書き込めなかった。壊れた ZIP ではなく、バッチ全体の失敗として扱う
    #[error("no entry could be written ({failed} fetches failed)")]
    EmptyBatch { failed: usize },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The writer thread did not return normally.
    #[error("archive writer stopped: {0}")]
    Relay(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("artifact not found: {0}")]
    NotFound(ArtifactId),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("ttl is out of range")]
    InvalidRetention,
}

/// The only error a batch surfaces to its caller.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Every fetch failed. Caller-fixable.
    #[error("could not fetch any images ({failed} failed)")]
    EmptyBatch { failed: usize },

    /// Writing the archive or persisting the artifact failed. Server-side.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::EmptyBatch { .. } => ErrorKind::Permanent,
            PipelineError::Persistence(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<ArchiveError> for PipelineError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::EmptyBatch { failed } => PipelineError::EmptyBatch { failed },
            other => PipelineError::Persistence(other.to_string()),
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::transport(FetchError::Transport("reset".into()), ErrorKind::Transient)]
    #[case::body(FetchError::Body("eof".into()), ErrorKind::Transient)]
    #[case::server_error(FetchError::Status(503), ErrorKind::Transient)]
    #[case::rate_limited(FetchError::Status(429), ErrorKind::Transient)]
    #[case::not_found(FetchError::Status(404), ErrorKind::Permanent)]
    #[case::forbidden(FetchError::Status(403), ErrorKind::Permanent)]
    fn fetch_error_kind(#[case] err: FetchError, #[case] expected: ErrorKind) {
        assert_eq!(err.kind(), expected);
    }

    #[test]
    fn empty_archive_maps_to_empty_batch() {
        let err: PipelineError = ArchiveError::EmptyBatch { failed: 3 }.into();
        assert!(matches!(err, PipelineError::EmptyBatch { failed: 3 }));
        assert_eq!(err.kind(), ErrorKind::Permanent);
    }

    #[test]
    fn io_failures_map_to_persistence() {
        let err: PipelineError = ArchiveError::Io(io::Error::other("disk full")).into();
        assert!(matches!(err, PipelineError::Persistence(_)));
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }
}
