//! HTTP client for the OCR API.
//!
//! Three endpoints are used, always in this order for local files:
//!
//! ```text
//! POST /files              multipart upload      → { "id": … }
//! GET  /files/{id}/url     signed retrieval URL  → { "url": … }
//! POST /ocr                OCR request           → OcrResponse JSON
//! ```
//!
//! URL inputs skip the first two steps.
//!
//! ## Retry Strategy
//!
//! Each endpoint has its own [`RetryPolicy`]. Transport errors, 5xx, 429,
//! empty bodies and malformed JSON are retried; any other non-success status
//! fails on the spot. The OCR endpoint waits `delay × attempt` after an empty
//! body because that usually means the backend is still busy with a large
//! document. When the budget runs out the last error is returned inside
//! [`OcrError::RetriesExhausted`].

use crate::config::{ClientConfig, RetryPolicy};
use crate::document::{check_local_file, DocumentKind};
use crate::error::OcrError;
use crate::progress::{NoopProgressCallback, ProcessProgressCallback};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Body, Response};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Thin wrapper over `reqwest::Client` bound to one API key and base URL.
pub struct OcrClient {
    http: reqwest::Client,
    config: ClientConfig,
}

#[derive(Debug, Deserialize)]
struct FileUploadResponse {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(default)]
    url: String,
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: DocumentRef<'a>,
    include_image_base64: bool,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DocumentRef<'a> {
    DocumentUrl { document_url: &'a str },
    ImageUrl { image_url: &'a str },
}

impl<'a> DocumentRef<'a> {
    fn new(kind: DocumentKind, url: &'a str) -> Self {
        match kind {
            DocumentKind::Document => DocumentRef::DocumentUrl { document_url: url },
            DocumentKind::Image => DocumentRef::ImageUrl { image_url: url },
        }
    }
}

impl OcrClient {
    /// Build a client from a validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self, OcrError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("mistral-ocr/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Upload a local file for OCR and return its file id.
    ///
    /// Files larger than [`ClientConfig::max_file_size`] are rejected before
    /// any request is made.
    pub async fn upload_file(&self, path: &Path) -> Result<String, OcrError> {
        let size = check_local_file(path, self.config.max_file_size).await?;
        let data = Bytes::from(tokio::fs::read(path).await.map_err(|e| {
            OcrError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            }
        })?);
        let len = data.len() as u64;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        info!("Uploading {} ({} bytes)", path.display(), size);
        self.progress().on_upload_start(path, size);

        let url = self.endpoint("files");
        let id = self
            .with_retry("upload file", &self.config.upload_retry, || {
                // Form is consumed by send(), so rebuild it for every attempt.
                // Cloning `Bytes` shares the buffer.
                let file = Part::stream_with_length(Body::from(data.clone()), len)
                    .file_name(file_name.clone());
                let form = Form::new().text("purpose", "ocr").part("file", file);
                let request = self
                    .http
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .header(header::ACCEPT, "application/json")
                    .multipart(form);
                async move {
                    let body = read_success_body(request.send().await?).await?;
                    let parsed: FileUploadResponse = parse_json(&body, "upload")?;
                    if parsed.id.is_empty() {
                        return Err(OcrError::MalformedResponse(
                            "received response without file ID".into(),
                        ));
                    }
                    Ok(parsed.id)
                }
            })
            .await?;

        info!("File uploaded successfully with ID: {}", id);
        self.progress().on_upload_complete(&id);
        Ok(id)
    }

    /// Fetch a time-limited signed URL for an uploaded file.
    pub async fn signed_url(&self, file_id: &str) -> Result<String, OcrError> {
        self.progress().on_signed_url_start(file_id);
        let url = self.endpoint(&format!("files/{file_id}/url"));
        let expiry = self.config.signed_url_expiry_hours.to_string();

        let signed = self
            .with_retry("get signed URL", &self.config.signed_url_retry, || {
                let request = self
                    .http
                    .get(&url)
                    .query(&[("expiry", expiry.as_str())])
                    .bearer_auth(&self.config.api_key)
                    .header(header::ACCEPT, "application/json");
                async move {
                    let body = read_success_body(request.send().await?).await?;
                    let parsed: SignedUrlResponse = parse_json(&body, "signed URL")?;
                    if parsed.url.is_empty() {
                        return Err(OcrError::MalformedResponse(
                            "API response did not contain a URL".into(),
                        ));
                    }
                    Ok(parsed.url)
                }
            })
            .await?;

        debug!("Signed URL for {}: {}", file_id, signed);
        Ok(signed)
    }

    /// Run OCR on a document reachable at `document_url`.
    ///
    /// Returns the raw JSON body, already checked to be valid JSON.
    pub async fn ocr(
        &self,
        kind: DocumentKind,
        document_url: &str,
        include_image_base64: bool,
    ) -> Result<String, OcrError> {
        info!("Processing with OCR (type: {})", kind);
        debug!("Include image base64: {}", include_image_base64);
        self.progress().on_ocr_start(kind);

        let url = self.endpoint("ocr");
        let body = OcrRequest {
            model: &self.config.model,
            document: DocumentRef::new(kind, document_url),
            include_image_base64,
        };

        let raw = self
            .with_retry("process document", &self.config.ocr_retry, || {
                let request = self
                    .http
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .header(header::ACCEPT, "application/json")
                    .json(&body);
                async move {
                    let bytes = read_success_body(request.send().await?).await?;
                    if serde_json::from_slice::<serde_json::Value>(&bytes).is_err() {
                        return Err(OcrError::MalformedResponse(
                            "received invalid JSON response from API".into(),
                        ));
                    }
                    String::from_utf8(bytes).map_err(|_| {
                        OcrError::MalformedResponse("response is not valid UTF-8".into())
                    })
                }
            })
            .await?;

        info!("OCR response received ({} bytes)", raw.len());
        self.progress().on_ocr_complete(raw.len());
        Ok(raw)
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    fn progress(&self) -> &dyn ProcessProgressCallback {
        match self.config.progress_callback {
            Some(ref cb) => cb.as_ref(),
            None => &NoopProgressCallback,
        }
    }

    /// Drive `attempt` until it succeeds, hits a non-retryable error, or
    /// exhausts `policy`.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        policy: &RetryPolicy,
        mut attempt: F,
    ) -> Result<T, OcrError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OcrError>>,
    {
        let max = policy.max_attempts.max(1);
        let mut n = 1;
        loop {
            let err = match attempt().await {
                Ok(v) => return Ok(v),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            warn!("{}: attempt {}/{} failed: {}", operation, n, max, err);
            if n >= max {
                return Err(OcrError::RetriesExhausted {
                    operation,
                    attempts: max,
                    last: Box::new(err),
                });
            }

            self.progress().on_retry(operation, n, max, &err.to_string());
            let wait = policy.delay_after(n, &err);
            debug!("{}: waiting {:?} before retry", operation, wait);
            sleep(wait).await;
            n += 1;
        }
    }
}

/// Turn a response into its body bytes, mapping failure statuses and empty
/// bodies to errors.
async fn read_success_body(resp: Response) -> Result<Vec<u8>, OcrError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;

    if !status.is_success() {
        let body = if bytes.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };
        return Err(OcrError::ApiStatus {
            status: status.as_u16(),
            body,
        });
    }

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(OcrError::EmptyResponse);
    }

    Ok(bytes.to_vec())
}

fn parse_json<T: for<'de> Deserialize<'de>>(body: &[u8], what: &str) -> Result<T, OcrError> {
    serde_json::from_slice(body)
        .map_err(|e| OcrError::MalformedResponse(format!("error parsing {what} response: {e}")))
}
