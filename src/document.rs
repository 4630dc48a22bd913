//! Input resolution: classify a user-supplied path or URL.
//!
//! A document is either a local file, which must be uploaded first, or a URL
//! the OCR service can fetch directly. Either way the extension decides
//! whether the API treats it as an image or as a generic document.

use crate::error::OcrError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions the API accepts as `image_url` documents.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// How the OCR request refers to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// PDFs, office documents, anything that is not an image.
    Document,
    /// A single raster image.
    Image,
}

impl DocumentKind {
    /// Classify by the (case-insensitive) extension of a file name or path.
    ///
    /// The whole string is matched, so `?` and `#` are ordinary characters
    /// here. Use [`DocumentKind::from_url`] for URLs.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if IMAGE_EXTENSIONS
            .iter()
            .any(|ext| lower.ends_with(&format!(".{ext}")))
        {
            DocumentKind::Image
        } else {
            DocumentKind::Document
        }
    }

    /// Classify a URL by the extension of its path, ignoring query and fragment.
    pub fn from_url(url: &str) -> Self {
        match reqwest::Url::parse(url) {
            Ok(parsed) => Self::from_name(parsed.path()),
            Err(_) => Self::from_name(url.split(['?', '#']).next().unwrap_or_default()),
        }
    }

    /// The wire value of `document.type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Document => "document_url",
            DocumentKind::Image => "image_url",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document reference supplied on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// A file on disk that must be uploaded.
    Local(PathBuf),
    /// A URL the API can fetch itself.
    Url(String),
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

impl DocumentSource {
    /// Parse the raw CLI argument. Does not touch the file system.
    pub fn parse(input: &str) -> Result<Self, OcrError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(OcrError::InvalidInput {
                input: input.to_string(),
                reason: "empty path".into(),
            });
        }
        if is_url(input) {
            Ok(DocumentSource::Url(input.to_string()))
        } else {
            Ok(DocumentSource::Local(PathBuf::from(input)))
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            DocumentSource::Local(p) => DocumentKind::from_name(&p.to_string_lossy()),
            DocumentSource::Url(u) => DocumentKind::from_url(u),
        }
    }

    /// File stem used as a fallback document title.
    pub fn stem(&self) -> Option<String> {
        match self {
            DocumentSource::Local(p) => p.file_stem().map(|s| s.to_string_lossy().into_owned()),
            DocumentSource::Url(u) => {
                let parsed = reqwest::Url::parse(u).ok()?;
                let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
                Path::new(last)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            }
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Local(p) => write!(f, "{}", p.display()),
            DocumentSource::Url(u) => f.write_str(u),
        }
    }
}

/// Validate that `path` is a readable file no larger than `max_bytes`.
///
/// Returns the file size. Runs before any network traffic so oversized
/// uploads never leave the machine.
pub async fn check_local_file(path: &Path, max_bytes: u64) -> Result<u64, OcrError> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OcrError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(OcrError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(OcrError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    if !meta.is_file() {
        return Err(OcrError::InvalidInput {
            input: path.display().to_string(),
            reason: "not a regular file".into(),
        });
    }

    let size = meta.len();
    if size > max_bytes {
        return Err(OcrError::FileTooLarge {
            path: path.to_path_buf(),
            size_bytes: size,
            max_bytes,
        });
    }

    debug!("Resolved local file: {} ({} bytes)", path.display(), size);
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn classify_by_extension() {
        assert_eq!(DocumentKind::from_name("scan.JPG"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_name("a/b/photo.jpeg"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_name("x.png"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_name("x.webp"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_name("x.gif"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_name("paper.pdf"), DocumentKind::Document);
        assert_eq!(DocumentKind::from_name("README"), DocumentKind::Document);
        assert_eq!(
            DocumentKind::from_url("https://cdn.example.com/p.png?sig=abc"),
            DocumentKind::Image
        );
        assert_eq!(
            DocumentKind::from_url("https://cdn.example.com/p.pdf#page=2"),
            DocumentKind::Document
        );
    }

    #[test]
    fn local_names_keep_hash_and_question_mark() {
        let invoice = DocumentSource::parse("scans/Invoice #42.png").unwrap();
        assert_eq!(invoice.kind(), DocumentKind::Image);
        let odd = DocumentSource::parse("what?.JPG").unwrap();
        assert_eq!(odd.kind(), DocumentKind::Image);
        let pdf = DocumentSource::parse("notes #1.png.pdf").unwrap();
        assert_eq!(pdf.kind(), DocumentKind::Document);
    }

    #[test]
    fn url_kind_uses_path_only() {
        let url = DocumentSource::parse("https://example.com/img/photo.webp?x=a.pdf").unwrap();
        assert_eq!(url.kind(), DocumentKind::Image);
        let url = DocumentSource::parse("https://example.com/doc?name=photo.png").unwrap();
        assert_eq!(url.kind(), DocumentKind::Document);
    }

    #[test]
    fn wire_names() {
        assert_eq!(DocumentKind::Document.as_str(), "document_url");
        assert_eq!(DocumentKind::Image.to_string(), "image_url");
    }

    #[test]
    fn parse_source() {
        assert_eq!(
            DocumentSource::parse("https://arxiv.org/pdf/1706.03762").unwrap(),
            DocumentSource::Url("https://arxiv.org/pdf/1706.03762".into())
        );
        assert_eq!(
            DocumentSource::parse("docs/report.pdf").unwrap(),
            DocumentSource::Local(PathBuf::from("docs/report.pdf"))
        );
        assert!(DocumentSource::parse("  ").is_err());
    }

    #[test]
    fn stems() {
        let local = DocumentSource::parse("docs/report.pdf").unwrap();
        assert_eq!(local.stem().as_deref(), Some("report"));
        let url = DocumentSource::parse("https://example.com/files/scan.png?x=1").unwrap();
        assert_eq!(url.stem().as_deref(), Some("scan"));
        let bare = DocumentSource::parse("https://example.com/").unwrap();
        assert_eq!(bare.stem(), None);
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = check_local_file(Path::new("/definitely/not/here.pdf"), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::FileNotFound { .. }));
    }
}
