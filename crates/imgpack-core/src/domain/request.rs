//! FetchRequest - 1 バッチ分の入力 URL

use serde::{Deserialize, Serialize};

/// Ordered, non-empty list of source URLs.
///
/// The order fixes each URL's index (and therefore its entry name); it does
/// not fix the order in which entries land in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FetchRequest {
    urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("a fetch request needs at least one url")]
pub struct EmptyRequest;

impl FetchRequest {
    pub fn new(urls: Vec<String>) -> Result<Self, EmptyRequest> {
        if urls.is_empty() {
            return Err(EmptyRequest);
        }
        Ok(Self { urls })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Always false.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl TryFrom<Vec<String>> for FetchRequest {
    type Error = EmptyRequest;

    fn try_from(urls: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(urls)
    }
}

impl From<FetchRequest> for Vec<String> {
    fn from(request: FetchRequest) -> Self {
        request.urls
    }
}
