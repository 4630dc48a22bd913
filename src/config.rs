//! Configuration types for the OCR client and the Markdown converter.
//!
//! Network behaviour lives in [`ClientConfig`]; output layout lives in
//! [`MarkdownOptions`]. Both are built through builders that start from the
//! documented defaults and validate in `build()`.

use crate::error::{OcrError, MAX_FILE_SIZE};
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

/// Default OCR model identifier.
pub const DEFAULT_MODEL: &str = "mistral-ocr-latest";

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "MISTRAL_API_KEY";

// ── Retry policy ─────────────────────────────────────────────────────────

/// How the wait between attempts grows when the API returns an empty body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Always wait `delay`.
    #[default]
    Fixed,
    /// Wait `delay × attempt` (1-indexed).
    Linear,
}

/// Bounded retry schedule for one kind of request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Must be ≥ 1.
    pub max_attempts: u32,
    /// Base wait between attempts.
    pub delay: Duration,
    /// Growth applied when the failure was an empty body.
    ///
    /// Every other transient failure waits the plain `delay`.
    pub empty_body_backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            empty_body_backoff: Backoff::Fixed,
        }
    }

    pub fn linear_on_empty(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            empty_body_backoff: Backoff::Linear,
        }
    }

    /// Wait before the next try, after `attempt` (1-indexed) failed with `err`.
    pub fn delay_after(&self, attempt: u32, err: &OcrError) -> Duration {
        match (err, self.empty_body_backoff) {
            (OcrError::EmptyResponse, Backoff::Linear) => self.delay * attempt.max(1),
            _ => self.delay,
        }
    }
}

// ── Client configuration ─────────────────────────────────────────────────

/// Configuration for [`crate::client::OcrClient`].
///
/// # Example
/// ```rust
/// use mistral_ocr::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .api_key("sk-test")
///     .timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "mistral-ocr-latest");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Bearer token sent with every request.
    pub api_key: String,

    /// API root, without a trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// OCR model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Per-request timeout in seconds. Default: 120.
    ///
    /// OCR on a long PDF is a single synchronous request, so this is
    /// deliberately generous.
    pub timeout_secs: u64,

    /// Lifetime requested for signed retrieval URLs, in hours. Default: 24.
    pub signed_url_expiry_hours: u32,

    /// Upload ceiling in bytes. Default: [`MAX_FILE_SIZE`].
    pub max_file_size: u64,

    /// Retries for `POST /files`. Default: 3 attempts, 3 s fixed.
    pub upload_retry: RetryPolicy,

    /// Retries for `GET /files/{id}/url`. Default: 3 attempts, 3 s fixed.
    pub signed_url_retry: RetryPolicy,

    /// Retries for `POST /ocr`. Default: 5 attempts, 10 s, linear on empty body.
    pub ocr_retry: RetryPolicy,

    /// Optional observer for upload / OCR / retry events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
            signed_url_expiry_hours: 24,
            max_file_size: MAX_FILE_SIZE,
            upload_retry: RetryPolicy::fixed(3, Duration::from_secs(3)),
            signed_url_retry: RetryPolicy::fixed(3, Duration::from_secs(3)),
            ocr_retry: RetryPolicy::linear_on_empty(5, Duration::from_secs(10)),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("signed_url_expiry_hours", &self.signed_url_expiry_hours)
            .field("max_file_size", &self.max_file_size)
            .field("upload_retry", &self.upload_retry)
            .field("signed_url_retry", &self.signed_url_retry)
            .field("ocr_retry", &self.ocr_retry)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ProcessProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
            api_key: None,
        }
    }
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    config: ClientConfig,
    api_key: Option<String>,
}

impl ClientConfigBuilder {
    /// Explicit API key. Falls back to `MISTRAL_API_KEY` when unset or empty.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    pub fn signed_url_expiry_hours(mut self, hours: u32) -> Self {
        self.config.signed_url_expiry_hours = hours;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn upload_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.upload_retry = policy;
        self
    }

    pub fn signed_url_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.signed_url_retry = policy;
        self
    }

    pub fn ocr_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.ocr_retry = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, resolving the API key and validating limits.
    pub fn build(self) -> Result<ClientConfig, OcrError> {
        let mut config = self.config;

        config.api_key = match self.api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => key,
            None => std::env::var(API_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or(OcrError::MissingApiKey)?,
        };

        config.base_url = config.base_url.trim_end_matches('/').to_string();
        if config.base_url.is_empty() {
            return Err(OcrError::InvalidConfig("base URL must not be empty".into()));
        }
        match reqwest::Url::parse(&config.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(_) => {
                return Err(OcrError::InvalidConfig(format!(
                    "base URL '{}' must be an http(s) URL with a host",
                    config.base_url
                )));
            }
            Err(e) => {
                return Err(OcrError::InvalidConfig(format!(
                    "invalid base URL '{}': {}",
                    config.base_url, e
                )));
            }
        }
        if config.model.trim().is_empty() {
            return Err(OcrError::InvalidConfig("model must not be empty".into()));
        }
        if config.signed_url_expiry_hours == 0 {
            return Err(OcrError::InvalidConfig(
                "signed URL expiry must be ≥ 1 hour".into(),
            ));
        }
        for (name, policy) in [
            ("upload", &config.upload_retry),
            ("signed URL", &config.signed_url_retry),
            ("OCR", &config.ocr_retry),
        ] {
            if policy.max_attempts == 0 {
                return Err(OcrError::InvalidConfig(format!(
                    "{name} retry policy needs at least 1 attempt"
                )));
            }
        }

        Ok(config)
    }
}

// ── Markdown options ─────────────────────────────────────────────────────

/// Whether converted pages land in one file or one file per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLayout {
    /// `<output_dir>/<index>.md` for every page. (default)
    #[default]
    PerPage,
    /// All pages concatenated under one title.
    SingleFile,
}

/// How to separate pages in single-file output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageSeparator {
    /// No visible break; pages joined with a blank line.
    None,
    /// Horizontal rule: "\n\n---\n\n" (default)
    #[default]
    HorizontalRule,
    /// HTML comment with the upcoming page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed before page `page_num` (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}

/// Options for turning an OCR response into Markdown files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Directory that receives the Markdown files. Default: `markdown_output`.
    pub output_dir: PathBuf,

    /// Single-file name, relative to `output_dir`. Default: `document.md`.
    pub output_file: Option<PathBuf>,

    /// Per-page or single-file output. Default: per page.
    pub layout: OutputLayout,

    /// Replace `![id](id)` placeholders with base64 data URIs. Default: false.
    pub include_images: bool,

    /// Separator between pages in single-file mode. Default: horizontal rule.
    pub page_separator: PageSeparator,

    /// Fall back to the input file stem when metadata has no title. Default: true.
    pub title_from_filename: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("markdown_output"),
            output_file: None,
            layout: OutputLayout::default(),
            include_images: false,
            page_separator: PageSeparator::default(),
            title_from_filename: true,
        }
    }
}

impl MarkdownOptions {
    pub fn builder() -> MarkdownOptionsBuilder {
        MarkdownOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Path of the combined document in single-file mode.
    pub fn single_file_path(&self) -> PathBuf {
        let name = self
            .output_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("document.md"));
        self.output_dir.join(name)
    }
}

/// Builder for [`MarkdownOptions`].
#[derive(Debug)]
pub struct MarkdownOptionsBuilder {
    options: MarkdownOptions,
}

impl MarkdownOptionsBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.output_dir = dir.into();
        self
    }

    /// Name the combined document. Implies [`OutputLayout::SingleFile`].
    pub fn output_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.options.output_file = Some(file.into());
        self.options.layout = OutputLayout::SingleFile;
        self
    }

    pub fn single_file(mut self, v: bool) -> Self {
        if v {
            self.options.layout = OutputLayout::SingleFile;
        } else if self.options.output_file.is_none() {
            self.options.layout = OutputLayout::PerPage;
        }
        self
    }

    pub fn include_images(mut self, v: bool) -> Self {
        self.options.include_images = v;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.options.page_separator = sep;
        self
    }

    /// `false` is shorthand for [`PageSeparator::None`].
    pub fn page_breaks(mut self, v: bool) -> Self {
        if !v {
            self.options.page_separator = PageSeparator::None;
        }
        self
    }

    pub fn title_from_filename(mut self, v: bool) -> Self {
        self.options.title_from_filename = v;
        self
    }

    pub fn build(self) -> Result<MarkdownOptions, OcrError> {
        if self.options.output_dir.as_os_str().is_empty() {
            return Err(OcrError::InvalidConfig(
                "output directory must not be empty".into(),
            ));
        }
        if let Some(ref f) = self.options.output_file {
            if f.as_os_str().is_empty() || f.file_name().is_none() {
                return Err(OcrError::InvalidConfig(format!(
                    "output file {:?} has no file name",
                    f
                )));
            }
        }
        Ok(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_policies_match_api_guidance() {
        let c = ClientConfig::default();
        assert_eq!(c.upload_retry.max_attempts, 3);
        assert_eq!(c.upload_retry.delay, Duration::from_secs(3));
        assert_eq!(c.ocr_retry.max_attempts, 5);
        assert_eq!(c.ocr_retry.empty_body_backoff, Backoff::Linear);
        assert_eq!(c.signed_url_expiry_hours, 24);
        assert_eq!(c.max_file_size, 52 * 1024 * 1024);
    }

    #[test]
    fn linear_backoff_only_for_empty_body() {
        let p = RetryPolicy::linear_on_empty(5, Duration::from_secs(10));
        assert_eq!(
            p.delay_after(3, &OcrError::EmptyResponse),
            Duration::from_secs(30)
        );
        let server = OcrError::ApiStatus {
            status: 503,
            body: String::new(),
        };
        assert_eq!(p.delay_after(3, &server), Duration::from_secs(10));

        let fixed = RetryPolicy::fixed(3, Duration::from_secs(3));
        assert_eq!(
            fixed.delay_after(2, &OcrError::EmptyResponse),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn builder_uses_explicit_key_and_trims_base_url() {
        let c = ClientConfig::builder()
            .api_key("key-123")
            .base_url("http://localhost:9000/v1/")
            .build()
            .unwrap();
        assert_eq!(c.api_key, "key-123");
        assert_eq!(c.base_url, "http://localhost:9000/v1");
    }

    // Tests below touch MISTRAL_API_KEY; hold the lock and restore the
    // previous value afterwards.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn with_api_key_env<T>(value: Option<&str>, f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let saved = std::env::var(API_KEY_ENV).ok();
        match value {
            Some(v) => std::env::set_var(API_KEY_ENV, v),
            None => std::env::remove_var(API_KEY_ENV),
        }
        let out = f();
        match saved {
            Some(v) => std::env::set_var(API_KEY_ENV, v),
            None => std::env::remove_var(API_KEY_ENV),
        }
        out
    }

    #[test]
    fn explicit_key_wins_over_env() {
        let c = with_api_key_env(Some("from-env"), || {
            ClientConfig::builder().api_key("explicit").build()
        })
        .unwrap();
        assert_eq!(c.api_key, "explicit");
    }

    #[test]
    fn env_key_used_when_none_given() {
        let c = with_api_key_env(Some("from-env"), || ClientConfig::builder().build()).unwrap();
        assert_eq!(c.api_key, "from-env");

        let blank_explicit =
            with_api_key_env(Some("from-env"), || ClientConfig::builder().api_key("  ").build())
                .unwrap();
        assert_eq!(blank_explicit.api_key, "from-env");
    }

    #[test]
    fn missing_or_blank_key_is_an_error() {
        let unset = with_api_key_env(None, || ClientConfig::builder().build());
        assert!(matches!(unset, Err(OcrError::MissingApiKey)));

        let blank = with_api_key_env(Some("   "), || ClientConfig::builder().api_key("").build());
        assert!(matches!(blank, Err(OcrError::MissingApiKey)));
    }

    #[test]
    fn builder_rejects_malformed_base_url() {
        for bad in ["not a url", "localhost:9000/v1", "ftp://files.example.com", "http://"] {
            let err = ClientConfig::builder()
                .api_key("k")
                .base_url(bad)
                .build()
                .unwrap_err();
            assert!(
                matches!(err, OcrError::InvalidConfig(ref m) if m.contains("base URL")),
                "{bad}: {err:?}"
            );
        }
    }

    #[test]
    fn builder_rejects_zero_attempts() {
        let err = ClientConfig::builder()
            .api_key("k")
            .ocr_retry(RetryPolicy::fixed(0, Duration::ZERO))
            .build()
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ClientConfig::builder().api_key("secret-key").build().unwrap();
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn output_file_implies_single_file() {
        let o = MarkdownOptions::builder()
            .output_dir("out")
            .output_file("book.md")
            .single_file(false)
            .build()
            .unwrap();
        assert_eq!(o.layout, OutputLayout::SingleFile);
        assert_eq!(o.single_file_path(), PathBuf::from("out/book.md"));
    }

    #[test]
    fn default_single_file_name() {
        let o = MarkdownOptions::builder().single_file(true).build().unwrap();
        assert_eq!(
            o.single_file_path(),
            PathBuf::from("markdown_output/document.md")
        );
    }

    #[test]
    fn page_breaks_off_means_no_separator() {
        let o = MarkdownOptions::builder().page_breaks(false).build().unwrap();
        assert_eq!(o.page_separator, PageSeparator::None);
        assert_eq!(o.page_separator.render(2), "\n\n");
    }

    #[test]
    fn separator_render() {
        assert_eq!(PageSeparator::HorizontalRule.render(2), "\n\n---\n\n");
        assert_eq!(PageSeparator::Comment.render(3), "\n\n<!-- page 3 -->\n\n");
        assert_eq!(
            PageSeparator::Custom("* * *".into()).render(1),
            "\n\n* * *\n\n"
        );
    }
}
