//! ArtifactStore port - 完成した ZIP の永続化と列挙
//!
//! # ライフサイクル
//! 1. `create_container()` でステージング領域に書き込み先を作る（ID はまだ割り当てない）
//! 2. ArchiveBuilder が書き込む
//! 3. `finalize()` で fsync → ID 割り当て → atomic rename（ここで初めて可視になる）
//! 4. GCLoop が `list_all()` / `delete()` で期限切れを回収

use std::io::{self, Seek, SeekFrom, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::domain::{Artifact, ArtifactAge, ArtifactId, StoreError};

/// Container は書き込み中のアーカイブ
///
/// drop されるとファイルごと消える（空バッチや失敗時に何も残らない）。
#[derive(Debug)]
pub struct Container {
    file: NamedTempFile,
}

impl Container {
    pub fn new(file: NamedTempFile) -> Self {
        Self { file }
    }

    /// Flush and fsync the staged bytes.
    pub fn sync(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.as_file().sync_all()
    }

    pub fn into_temp_file(self) -> NamedTempFile {
        self.file
    }
}

impl Write for Container {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for Container {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

/// ArtifactStore は artifact の名前空間を唯一所有する
///
/// # 設計原則
/// - 変更は `finalize` と `delete` だけ
/// - `finalize` が返った時点で bytes は durable（部分的に見えることはない）
/// - 作成時刻は ArtifactId のタイムスタンプから読む
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    fn create_container(&self) -> Result<Container, StoreError>;

    async fn finalize(&self, container: Container) -> Result<Artifact, StoreError>;

    async fn resolve(&self, id: &ArtifactId) -> Result<PathBuf, StoreError>;

    async fn list_all(&self) -> Result<Vec<ArtifactAge>, StoreError>;

    async fn delete(&self, id: &ArtifactId) -> Result<(), StoreError>;
}
