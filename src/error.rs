//! Error types for the mistral-ocr library.
//!
//! Everything fatal is an [`OcrError`]. Variants fall into four groups that
//! mirror how a run can go wrong:
//!
//! * **Configuration**: no API key, or a builder rejected its inputs.
//! * **Input**: the document or JSON file is missing, too large, or malformed.
//! * **API**: the remote service misbehaved. Some of these are transient and
//!   retried by [`crate::client::OcrClient`]; see [`OcrError::is_retryable`].
//! * **Output**: a result file could not be written.

use std::path::PathBuf;
use thiserror::Error;

/// Size ceiling enforced before uploading (52 MiB).
pub const MAX_FILE_SIZE: u64 = 52 * 1024 * 1024;

/// All errors returned by the mistral-ocr library.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// No API key was passed and `MISTRAL_API_KEY` is unset.
    #[error(
        "MISTRAL_API_KEY environment variable is not set and no --api-key flag was provided"
    )]
    MissingApiKey,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// File exceeds the upload ceiling; rejected before any request is sent.
    #[error(
        "File '{path}' is too large ({:.2} MB). Maximum allowed size is {:.2} MB",
        mib(.size_bytes),
        mib(.max_bytes)
    )]
    FileTooLarge {
        path: PathBuf,
        size_bytes: u64,
        max_bytes: u64,
    },

    /// The input string is neither an existing path nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// OCR JSON could not be deserialised into the response model.
    #[error("Error parsing OCR JSON: {detail}{}", format_keys(.top_level_keys))]
    InvalidJson {
        detail: String,
        top_level_keys: Vec<String>,
    },

    // ── API errors ────────────────────────────────────────────────────────
    /// The request never produced an HTTP response (DNS, TLS, timeout, …).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API returned error status: {status} - {body}")]
    ApiStatus { status: u16, body: String },

    /// The API answered 2xx with an empty body.
    #[error("Received empty response from API")]
    EmptyResponse,

    /// The body was not the JSON shape we expected.
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    /// Every attempt failed; `last` is the final error observed.
    #[error("Failed to {operation} after {attempts} attempts. Last error: {last}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        last: Box<OcrError>,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read an input file.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OcrError {
    /// Whether the client should try the same request again.
    ///
    /// Transport failures, 5xx, 429, empty bodies and malformed JSON are
    /// transient. Any other HTTP status is a client error and fails fast.
    pub fn is_retryable(&self) -> bool {
        match self {
            // A request that could not even be built fails the same way every time.
            OcrError::Http(e) => !e.is_builder(),
            OcrError::EmptyResponse | OcrError::MalformedResponse(_) => true,
            OcrError::ApiStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

fn mib(bytes: &u64) -> f64 {
    *bytes as f64 / 1024.0 / 1024.0
}

fn format_keys(keys: &[String]) -> String {
    if keys.is_empty() {
        String::new()
    } else {
        format!("\nJSON top-level keys: {}", keys.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_too_large_display() {
        let e = OcrError::FileTooLarge {
            path: PathBuf::from("big.pdf"),
            size_bytes: 60 * 1024 * 1024,
            max_bytes: MAX_FILE_SIZE,
        };
        let msg = e.to_string();
        assert!(msg.contains("60.00 MB"), "got: {msg}");
        assert!(msg.contains("52.00 MB"), "got: {msg}");
    }

    #[test]
    fn retryable_statuses() {
        let status = |s| OcrError::ApiStatus {
            status: s,
            body: String::new(),
        };
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!status(404).is_retryable());
    }

    #[test]
    fn request_build_errors_are_not_retried() {
        let err = reqwest::Client::new().get("not a url").build().unwrap_err();
        assert!(err.is_builder());
        assert!(!OcrError::from(err).is_retryable());
    }

    #[test]
    fn transient_body_errors_are_retryable() {
        assert!(OcrError::EmptyResponse.is_retryable());
        assert!(OcrError::MalformedResponse("no id".into()).is_retryable());
        assert!(!OcrError::MissingApiKey.is_retryable());
    }

    #[test]
    fn retries_exhausted_wraps_last_error() {
        let e = OcrError::RetriesExhausted {
            operation: "upload file",
            attempts: 3,
            last: Box::new(OcrError::EmptyResponse),
        };
        let msg = e.to_string();
        assert!(msg.contains("upload file"), "got: {msg}");
        assert!(msg.contains("3 attempts"), "got: {msg}");
        assert!(msg.contains("empty response"), "got: {msg}");
    }

    #[test]
    fn invalid_json_lists_keys() {
        let e = OcrError::InvalidJson {
            detail: "missing field `pages`".into(),
            top_level_keys: vec!["object".into(), "data".into()],
        };
        assert!(e.to_string().contains("object, data"));

        let bare = OcrError::InvalidJson {
            detail: "EOF".into(),
            top_level_keys: vec![],
        };
        assert!(!bare.to_string().contains("top-level"));
    }
}
