//! End-to-end entry points.
//!
//! ```text
//! local file ─▶ upload ─▶ signed URL ─┐
//!                                     ├─▶ OCR ─▶ (JSON file) ─▶ Markdown
//! URL ────────────────────────────────┘
//! ```
//!
//! Each step runs strictly after the previous one; nothing here is
//! concurrent.

use crate::client::OcrClient;
use crate::config::{ClientConfig, MarkdownOptions};
use crate::document::DocumentSource;
use crate::error::OcrError;
use crate::output::{self, ConversionSummary};
use crate::response::OcrResponse;
use std::path::Path;
use tracing::info;

/// Run OCR on a local file or URL and return the raw JSON response.
pub async fn process(
    input: &str,
    config: &ClientConfig,
    include_image_base64: bool,
) -> Result<String, OcrError> {
    let source = DocumentSource::parse(input)?;
    let client = OcrClient::new(config.clone())?;
    process_source(&client, &source, include_image_base64).await
}

/// Like [`process`], reusing an existing client.
pub async fn process_source(
    client: &OcrClient,
    source: &DocumentSource,
    include_image_base64: bool,
) -> Result<String, OcrError> {
    let kind = source.kind();
    match source {
        DocumentSource::Url(url) => {
            info!("Processing URL: {}", url);
            client.ocr(kind, url, include_image_base64).await
        }
        DocumentSource::Local(path) => {
            info!("Processing local file: {}", path.display());
            let file_id = client.upload_file(path).await?;
            let signed = client.signed_url(&file_id).await?;
            client.ocr(kind, &signed, include_image_base64).await
        }
    }
}

/// Run OCR and write Markdown in one go.
///
/// When `json_path` is set the pretty-printed response is saved there first.
/// Inlining images in the Markdown requires the API to return them, so
/// `options.include_images` also requests base64 image payloads.
pub async fn process_to_markdown(
    input: &str,
    config: &ClientConfig,
    options: &MarkdownOptions,
    json_path: Option<&Path>,
) -> Result<ConversionSummary, OcrError> {
    let source = DocumentSource::parse(input)?;
    let client = OcrClient::new(config.clone())?;
    let raw = process_source(&client, &source, options.include_images).await?;

    if let Some(path) = json_path {
        output::write_json(&raw, path).await?;
    }

    info!("Converting JSON to Markdown");
    let response = OcrResponse::from_json(&raw)?;
    let stem = source.stem();
    output::write_markdown(&response, stem.as_deref(), options).await
}
