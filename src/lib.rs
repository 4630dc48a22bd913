//! # mistral-ocr
//!
//! Send documents to the Mistral OCR API and turn the structured JSON it
//! returns into Markdown.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file / URL
//!  │
//!  ├─ 1. Input    classify as image or document; size-check local files
//!  ├─ 2. Upload   POST /files (local files only)
//!  ├─ 3. Sign     GET /files/{id}/url → time-limited URL
//!  ├─ 4. OCR      POST /ocr with retry on transient failures
//!  ├─ 5. JSON     optional pretty-printed copy of the response
//!  └─ 6. Markdown one file per page, or one combined document
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mistral_ocr::{process_to_markdown, ClientConfig, MarkdownOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from MISTRAL_API_KEY
//!     let config = ClientConfig::builder().build()?;
//!     let options = MarkdownOptions::builder()
//!         .output_dir("out")
//!         .output_file("paper.md")
//!         .build()?;
//!     let summary = process_to_markdown("paper.pdf", &config, &options, None).await?;
//!     eprintln!("{} pages → {:?}", summary.total_pages, summary.files);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mistral-ocr` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod markdown;
pub mod output;
pub mod process;
pub mod progress;
pub mod response;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::OcrClient;
pub use config::{
    Backoff, ClientConfig, ClientConfigBuilder, MarkdownOptions, MarkdownOptionsBuilder,
    OutputLayout, PageSeparator, RetryPolicy,
};
pub use document::{DocumentKind, DocumentSource};
pub use error::{OcrError, MAX_FILE_SIZE};
pub use output::{convert_file, write_json, write_markdown, ConversionSummary};
pub use process::{process, process_source, process_to_markdown};
pub use progress::{NoopProgressCallback, ProcessProgressCallback, ProgressCallback};
pub use response::{DocumentMetadata, OcrImage, OcrPage, OcrResponse, PageDimensions, UsageInfo};
