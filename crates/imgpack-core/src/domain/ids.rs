//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID
//! Artifact の identity には ULID (Universally Unique Lexicographically Sortable Identifier) を使います。
//!
//! ## ULID の特性
//! - **作成時刻を内包**: 先頭 48-bit がミリ秒タイムスタンプ。作成時刻は ID から復元できる
//! - **衝突耐性**: 後続 80-bit がランダム。同一ミリ秒に発行しても実質的に衝突しない
//! - **時刻でソート可能**: 生成順序でソートできる
//!
//! ## Phantom Type パターン
//! `Id<T>` で共通実装を提供しつつ、`T` はマーカー型として
//! コンパイル時に ArtifactId と BatchId の混同を防ぎます。

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display / FromStr で使うプレフィックス（"images-", "batch-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }

    /// ID に埋め込まれた作成時刻（ミリ秒精度）
    pub fn created_at(&self) -> DateTime<Utc> {
        let millis = self.ulid.timestamp_ms() as i64;
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// `Display` の逆変換に失敗したとき
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identifier: {0}")]
pub struct ParseIdError(pub String);

impl<T: IdMarker> FromStr for Id<T> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .strip_prefix(T::prefix())
            .ok_or_else(|| ParseIdError(s.to_string()))?;
        let ulid = Ulid::from_string(raw).map_err(|_| ParseIdError(s.to_string()))?;
        Ok(Self::from_ulid(ulid))
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Artifact のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Artifact {}

impl IdMarker for Artifact {
    fn prefix() -> &'static str {
        "images-"
    }
}

/// Batch のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Batch {}

impl IdMarker for Batch {
    fn prefix() -> &'static str {
        "batch-"
    }
}

/// Identity of a persisted archive. Also the stem of its file name.
pub type ArtifactId = Id<Artifact>;

/// Correlation id of one request's batch (logging only).
pub type BatchId = Id<Batch>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix() {
        let ulid = Ulid::new();
        let artifact = ArtifactId::from_ulid(ulid);
        let batch = BatchId::from_ulid(ulid);

        assert_eq!(artifact.to_string(), format!("images-{ulid}"));
        assert_eq!(batch.to_string(), format!("batch-{ulid}"));
    }

    #[test]
    fn parse_accepts_display_output() {
        let id = ArtifactId::from_ulid(Ulid::new());
        let parsed: ArtifactId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_wrong_prefix_and_garbage() {
        let ulid = Ulid::new();
        assert!(format!("batch-{ulid}").parse::<ArtifactId>().is_err());
        assert!("images-not-a-ulid".parse::<ArtifactId>().is_err());
        assert!("".parse::<ArtifactId>().is_err());
    }

    #[test]
    fn created_at_is_embedded_timestamp() {
        let millis = 1_704_110_400_123u64;
        let id = ArtifactId::from_ulid(Ulid::from_parts(millis, 42));
        assert_eq!(id.created_at().timestamp_millis(), millis as i64);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<ArtifactId>(), size_of::<Ulid>());
        assert_eq!(size_of::<BatchId>(), 16);
    }
}
