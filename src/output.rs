//! Writing results to disk.
//!
//! All writes go through [`write_atomic`]: write to a sibling `.tmp` file,
//! then rename, so an interrupted run never leaves a half-written file
//! behind.

use crate::config::{MarkdownOptions, OutputLayout};
use crate::error::OcrError;
use crate::markdown::{render_document, render_page, resolve_title};
use crate::response::OcrResponse;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What a Markdown conversion produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    /// Every file written, in write order.
    pub files: Vec<PathBuf>,
    /// Pages in the OCR response.
    pub total_pages: usize,
    pub output_dir: PathBuf,
}

/// Pretty-print a raw JSON body with two-space indentation.
pub fn pretty_json(raw: &str) -> Result<String, OcrError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| OcrError::InvalidJson {
            detail: e.to_string(),
            top_level_keys: Vec::new(),
        })?;
    serde_json::to_string_pretty(&value).map_err(|e| OcrError::InvalidJson {
        detail: e.to_string(),
        top_level_keys: Vec::new(),
    })
}

/// Pretty-print `raw` and save it to `path`, creating parent directories.
pub async fn write_json(raw: &str, path: &Path) -> Result<(), OcrError> {
    let pretty = pretty_json(raw)?;
    write_atomic(path, pretty.as_bytes()).await?;
    info!("OCR results saved to {}", path.display());
    Ok(())
}

/// Render `response` as Markdown and write it under `options.output_dir`.
///
/// `source_stem` is the title fallback for single-file output (the JSON or
/// document file name without extension).
pub async fn write_markdown(
    response: &OcrResponse,
    source_stem: Option<&str>,
    options: &MarkdownOptions,
) -> Result<ConversionSummary, OcrError> {
    create_dir_all(&options.output_dir).await?;

    let mut files = Vec::new();
    match options.layout {
        OutputLayout::SingleFile => {
            let title = resolve_title(
                response.metadata.as_ref(),
                source_stem,
                options.title_from_filename,
            );
            let markdown = render_document(response, &title, options);
            let path = options.single_file_path();
            write_atomic(&path, markdown.as_bytes()).await?;
            info!("Created single markdown file: {}", path.display());
            files.push(path);
        }
        OutputLayout::PerPage => {
            for page in response.pages_in_order() {
                let path = options.output_dir.join(format!("{}.md", page.index));
                write_atomic(&path, render_page(page, options).as_bytes()).await?;
                debug!("Created markdown file: {}", path.display());
                files.push(path);
            }
        }
    }

    info!(
        "Converted {} pages into {} file(s) in {}",
        response.pages.len(),
        files.len(),
        options.output_dir.display()
    );

    Ok(ConversionSummary {
        files,
        total_pages: response.pages.len(),
        output_dir: options.output_dir.clone(),
    })
}

/// Read a saved OCR JSON file and convert it to Markdown.
///
/// The JSON file's stem is the title fallback.
pub async fn convert_file(
    json_path: &Path,
    options: &MarkdownOptions,
) -> Result<ConversionSummary, OcrError> {
    let data = match tokio::fs::read_to_string(json_path).await {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OcrError::FileNotFound {
                path: json_path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(OcrError::ReadFailed {
                path: json_path.to_path_buf(),
                source: e,
            });
        }
    };

    let response = OcrResponse::from_json(&data)?;
    let stem = json_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned());
    write_markdown(&response, stem.as_deref(), options).await
}

/// Write `contents` to `path` via temp file + rename, creating parents.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), OcrError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent).await?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let fail = |source| OcrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(&tmp_path, contents).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;
    Ok(())
}

async fn create_dir_all(dir: &Path) -> Result<(), OcrError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| OcrError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })
}
