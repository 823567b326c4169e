//! Entry naming inside one archive.
//!
//! `image-<batchTimestamp>-<originalIndex>.<ext>`
//!
//! - 名前は入力順の index から決まる（受信順ではない）
//! - index を埋め込むので 1 アーカイブ内で一意

use std::fmt;

use url::Url;

/// Extension inferred from the URL's last path segment.
///
/// Query and fragment are ignored, the result is lower-cased and `jpg` is
/// normalized to `jpeg`. A segment without a dot has no extension; nothing is
/// validated and no default is substituted.
pub fn infer_extension(url: &str) -> Option<String> {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string)?,
        Err(_) => {
            let without_fragment = url.split('#').next().unwrap_or_default();
            let path = without_fragment.split('?').next().unwrap_or_default();
            path.rsplit('/').next().unwrap_or_default().to_string()
        }
    };

    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    let ext = ext.to_lowercase();
    if ext == "jpg" {
        Some("jpeg".to_string())
    } else {
        Some(ext)
    }
}

/// Name of one entry in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryName {
    batch_timestamp: i64,
    index: usize,
    extension: Option<String>,
}

impl EntryName {
    pub fn new(batch_timestamp: i64, index: usize, extension: Option<String>) -> Self {
        Self {
            batch_timestamp,
            index,
            extension,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image-{}-{}", self.batch_timestamp, self.index)?;
        if let Some(ext) = &self.extension {
            write!(f, ".{ext}")?;
        }
        Ok(())
    }
}
