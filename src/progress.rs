//! Progress-callback trait for upload and OCR events.
//!
//! Inject an [`Arc<dyn ProcessProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to observe the
//! request pipeline as it runs. The CLI uses this to drive a spinner; library
//! callers can forward events wherever they like.
//!
//! # Example
//!
//! ```rust
//! use mistral_ocr::{ClientConfig, ProcessProgressCallback};
//! use std::sync::Arc;
//!
//! struct Logger;
//!
//! impl ProcessProgressCallback for Logger {
//!     fn on_retry(&self, operation: &str, attempt: u32, max_attempts: u32, error: &str) {
//!         eprintln!("{operation}: attempt {attempt}/{max_attempts} failed: {error}");
//!     }
//! }
//!
//! let config = ClientConfig::builder()
//!     .api_key("sk-test")
//!     .progress_callback(Arc::new(Logger))
//!     .build()
//!     .unwrap();
//! ```

use crate::document::DocumentKind;
use std::path::Path;
use std::sync::Arc;

/// Called by [`crate::client::OcrClient`] at each stage of a request.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ProcessProgressCallback: Send + Sync {
    /// Called once the size check passed, before the upload is sent.
    fn on_upload_start(&self, path: &Path, size_bytes: u64) {
        let _ = (path, size_bytes);
    }

    /// Called when the API has accepted the upload.
    fn on_upload_complete(&self, file_id: &str) {
        let _ = file_id;
    }

    /// Called before requesting a signed URL for an uploaded file.
    fn on_signed_url_start(&self, file_id: &str) {
        let _ = file_id;
    }

    /// Called before the OCR request is sent.
    fn on_ocr_start(&self, kind: DocumentKind) {
        let _ = kind;
    }

    /// Called when the OCR response has been received and validated.
    ///
    /// # Arguments
    /// * `body_len` — byte length of the raw JSON response
    fn on_ocr_complete(&self, body_len: usize) {
        let _ = body_len;
    }

    /// Called after a transient failure, before waiting for the next attempt.
    ///
    /// # Arguments
    /// * `operation`    — short label, e.g. "upload file"
    /// * `attempt`      — 1-indexed attempt that just failed
    /// * `max_attempts` — attempts allowed by the policy
    /// * `error`        — human-readable error description
    fn on_retry(&self, operation: &str, attempt: u32, max_attempts: u32, error: &str) {
        let _ = (operation, attempt, max_attempts, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ProcessProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn ProcessProgressCallback>;
