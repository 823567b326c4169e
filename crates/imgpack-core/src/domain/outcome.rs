//! Outcome model: the per-URL result of a fetch.
//!
//! Every URL resolves to exactly one `FetchOutcome`, produced independently
//! and out of order. Outcomes carry the URL's original index so the archive
//! builder can name the entry without knowing the input order.

use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

use super::errors::FetchError;

/// A remote body, relayed chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, FetchError>> + Send + 'static>>;

/// A successfully opened remote image.
pub struct FetchedImage {
    pub extension: Option<String>,
    pub body: ByteStream,
}

impl FetchedImage {
    pub fn new(extension: Option<String>, body: ByteStream) -> Self {
        Self { extension, body }
    }
}

impl fmt::Debug for FetchedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchedImage")
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum FetchOutcome {
    Success {
        index: usize,
        url: String,
        image: FetchedImage,
    },
    Failure {
        index: usize,
        url: String,
        reason: FetchError,
        attempts: u32,
    },
}

impl FetchOutcome {
    pub fn index(&self) -> usize {
        match self {
            FetchOutcome::Success { index, .. } | FetchOutcome::Failure { index, .. } => *index,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FetchOutcome::Success { url, .. } | FetchOutcome::Failure { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn empty_body() -> ByteStream {
        Box::pin(stream::empty::<Result<Bytes, FetchError>>())
    }

    #[test]
    fn accessors_cover_both_variants() {
        let ok = FetchOutcome::Success {
            index: 2,
            url: "https://x/a.png".into(),
            image: FetchedImage::new(Some("png".into()), empty_body()),
        };
        let failed = FetchOutcome::Failure {
            index: 5,
            url: "https://x/b.png".into(),
            reason: FetchError::Status(404),
            attempts: 1,
        };

        assert!(ok.is_success());
        assert_eq!(ok.index(), 2);
        assert!(!failed.is_success());
        assert_eq!(failed.index(), 5);
        assert_eq!(failed.url(), "https://x/b.png");
    }

    #[test]
    fn debug_does_not_touch_the_body() {
        let image = FetchedImage::new(None, empty_body());
        assert!(format!("{image:?}").contains("FetchedImage"));
    }
}
