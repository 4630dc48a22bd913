//! OCR response model.
//!
//! Mirrors the JSON returned by `POST /ocr`. Every field outside `pages`
//! is optional and unknown fields are ignored, so older saved responses and
//! newer API revisions both deserialise.

use crate::error::OcrError;
use serde::{Deserialize, Serialize};

/// Top-level OCR response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrResponse {
    /// Pages in the order the API returned them.
    pub pages: Vec<OcrPage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,

    /// Model that produced the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_info: Option<UsageInfo>,
}

/// One OCR'd page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    /// 0-based page index.
    pub index: usize,

    /// Page content; images appear as `![id](id)` placeholders.
    #[serde(default)]
    pub markdown: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<OcrImage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<PageDimensions>,
}

/// An image extracted from a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrImage {
    /// Identifier referenced by the page Markdown, e.g. `img-0.jpeg`.
    pub id: String,
    #[serde(default)]
    pub top_left_x: Option<i64>,
    #[serde(default)]
    pub top_left_y: Option<i64>,
    #[serde(default)]
    pub bottom_right_x: Option<i64>,
    #[serde(default)]
    pub bottom_right_y: Option<i64>,
    /// Present only when the request set `include_image_base64`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

/// Rendered page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDimensions {
    #[serde(default)]
    pub dpi: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub width: u32,
}

/// Document-level metadata, when the API reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

/// Billing information attached to the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    #[serde(default)]
    pub pages_processed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_size_bytes: Option<u64>,
}

impl OcrResponse {
    /// Parse an OCR response from raw JSON.
    ///
    /// On failure the error lists the payload's top-level keys (when it is an
    /// object) so a wrong file is easy to recognise.
    pub fn from_json(data: &str) -> Result<Self, OcrError> {
        serde_json::from_str(data).map_err(|e| {
            let top_level_keys = match serde_json::from_str::<serde_json::Value>(data) {
                Ok(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
                _ => Vec::new(),
            };
            OcrError::InvalidJson {
                detail: e.to_string(),
                top_level_keys,
            }
        })
    }

    /// Pages sorted by ascending index.
    pub fn pages_in_order(&self) -> Vec<&OcrPage> {
        let mut pages: Vec<&OcrPage> = self.pages.iter().collect();
        pages.sort_by_key(|p| p.index);
        pages
    }
}

impl DocumentMetadata {
    /// Non-empty title, if any.
    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    pub fn author(&self) -> Option<&str> {
        non_empty(&self.author)
    }

    pub fn creation_date(&self) -> Option<&str> {
        non_empty(&self.creation_date)
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
