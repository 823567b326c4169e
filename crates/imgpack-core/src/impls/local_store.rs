//! LocalArtifactStore - ローカルディレクトリに artifact を置く
//!
//! # レイアウト
//! ```text
//! <root>/
//!   images-<ULID>.zip     完成した artifact（可視）
//!   .staging/             書き込み中のコンテナ（不可視）
//! ```
//!
//! ステージングと本体は同じファイルシステム上にあるので、
//! `finalize` の rename は atomic です。読み手も GC も書きかけのファイルを見ません。

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use tracing::{debug, info, warn};

use crate::domain::artifact::{self, Artifact, ArtifactAge};
use crate::domain::{ArtifactId, StoreError};
use crate::ports::{ArtifactStore, Clock, Container, IdGenerator, UlidGenerator};

const STAGING_DIR: &str = ".staging";

/// How many identities `finalize` draws before giving up on collisions.
const MAX_IDENTITY_ATTEMPTS: usize = 8;

pub struct LocalArtifactStore {
    root: PathBuf,
    staging: PathBuf,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl LocalArtifactStore {
    /// Prepare `root` and discard containers left behind by a previous process.
    pub fn open(
        root: impl Into<PathBuf>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);
        std::fs::create_dir_all(&staging)?;
        let ttl = TimeDelta::from_std(ttl).map_err(|_| StoreError::InvalidRetention)?;

        let removed = clear_staging(&staging)?;
        if removed > 0 {
            info!(removed, dir = %staging.display(), "removed stale staging files");
        }

        Ok(Self {
            root,
            staging,
            ttl,
            ids: Arc::new(UlidGenerator::new(Arc::clone(&clock))),
            clock,
        })
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    fn path_of(&self, id: &ArtifactId) -> PathBuf {
        self.root.join(artifact::file_name(id))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    fn create_container(&self) -> Result<Container, StoreError> {
        let file = tempfile::Builder::new()
            .prefix("images-")
            .suffix(".zip.part")
            .tempfile_in(&self.staging)?;
        Ok(Container::new(file))
    }

    async fn finalize(&self, container: Container) -> Result<Artifact, StoreError> {
        let root = self.root.clone();
        let ids = Arc::clone(&self.ids);
        let ttl = self.ttl;

        tokio::task::spawn_blocking(move || persist(container, &root, ids.as_ref(), ttl))
            .await
            .map_err(|e| StoreError::Io(io::Error::other(e.to_string())))?
    }

    async fn resolve(&self, id: &ArtifactId) -> Result<PathBuf, StoreError> {
        let path = self.path_of(id);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(StoreError::NotFound(*id)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(*id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_all(&self) -> Result<Vec<ArtifactAge>, StoreError> {
        let now = self.clock.now();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        let mut artifacts = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(artifact::parse_file_name) else {
                continue;
            };
            // 時計が巻き戻った場合は 0 扱い（削除対象にしない）
            let age = (now - id.created_at()).to_std().unwrap_or(Duration::ZERO);
            artifacts.push(ArtifactAge { id, age });
        }

        artifacts.sort_by_key(|a| a.id);
        Ok(artifacts)
    }

    async fn delete(&self, id: &ArtifactId) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_of(id)).await {
            Ok(()) => {
                debug!(artifact = %id, "artifact deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(*id)),
            Err(e) => Err(e.into()),
        }
    }
}

fn persist(
    mut container: Container,
    root: &Path,
    ids: &dyn IdGenerator,
    ttl: TimeDelta,
) -> Result<Artifact, StoreError> {
    container.sync()?;
    let mut file = container.into_temp_file();

    for _ in 0..MAX_IDENTITY_ATTEMPTS {
        let id = ids.generate_artifact_id();
        let path = root.join(artifact::file_name(&id));

        match file.persist_noclobber(&path) {
            Ok(_) => {
                sync_dir(root)?;
                return Ok(Artifact::new(id, path, ttl));
            }
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                warn!(artifact = %id, "identity already taken, drawing another");
                file = err.file;
            }
            Err(err) => return Err(err.error.into()),
        }
    }

    Err(StoreError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "could not allocate a unique artifact identity",
    )))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn clear_staging(staging: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(staging)? {
        let path = entry?.path();
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove staging file"),
        }
    }
    Ok(removed)
}
