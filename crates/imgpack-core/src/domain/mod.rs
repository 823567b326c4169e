//! Domain model (IDs, requests, outcomes, artifacts, errors).
//!
//! I/O を持たない型だけを置きます。
//! - ids: ArtifactId / BatchId（ULID）
//! - request: FetchRequest
//! - outcome: FetchOutcome / FetchedImage / ByteStream
//! - entry: アーカイブ内のエントリ名と拡張子推定
//! - artifact: Artifact / ArtifactLocator / 期限計算
//! - errors: FetchError / ArchiveError / StoreError / PipelineError

pub mod artifact;
pub mod entry;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod request;

pub use artifact::{Artifact, ArtifactAge, ArtifactLocator};
pub use entry::{EntryName, infer_extension};
pub use errors::{ArchiveError, ErrorKind, FetchError, PipelineError, StoreError};
pub use ids::{ArtifactId, BatchId};
pub use outcome::{ByteStream, FetchOutcome, FetchedImage};
pub use request::FetchRequest;
