//! Artifact - 永続化された ZIP コンテナ
//!
//! # 不変条件
//! - 作成時刻は ArtifactId に埋め込まれたタイムスタンプと常に一致する
//! - 期限 = 作成時刻 + TTL（グローバルな定数のみから決まる純粋関数）

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::ids::ArtifactId;

/// File extension of every persisted container.
pub const ARCHIVE_SUFFIX: &str = ".zip";

pub fn expires_at(created_at: DateTime<Utc>, ttl: TimeDelta) -> DateTime<Utc> {
    created_at + ttl
}

/// A finished, durable container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub id: ArtifactId,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(id: ArtifactId, path: PathBuf, ttl: TimeDelta) -> Self {
        let created_at = id.created_at();
        Self {
            id,
            path,
            created_at,
            expires_at: expires_at(created_at, ttl),
        }
    }

    /// `images-<ULID>.zip`
    pub fn file_name(&self) -> String {
        file_name(&self.id)
    }
}

pub fn file_name(id: &ArtifactId) -> String {
    format!("{id}{ARCHIVE_SUFFIX}")
}

/// Inverse of [`file_name`]. `None` for anything that is not an artifact.
pub fn parse_file_name(name: &str) -> Option<ArtifactId> {
    name.strip_suffix(ARCHIVE_SUFFIX)?.parse().ok()
}

/// One row of the store's enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactAge {
    pub id: ArtifactId,
    pub age: Duration,
}

/// What callers receive for a finished batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocator {
    pub url: String,
    pub expires: DateTime<Utc>,
}

impl ArtifactLocator {
    /// `<base>/downloads/<file>`; a missing trailing slash on `base` is tolerated.
    pub fn new(base: &Url, artifact: &Artifact) -> Result<Self, url::ParseError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let url = base.join(&format!("downloads/{}", artifact.file_name()))?;
        Ok(Self {
            url: url.to_string(),
            expires: artifact.expires_at,
        })
    }
}
