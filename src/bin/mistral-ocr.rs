//! CLI binary for mistral-ocr.
//!
//! A thin shim over the library crate that maps subcommands and flags to
//! `ClientConfig` / `MarkdownOptions` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use mistral_ocr::{
    convert_file, output, process, process_to_markdown, ClientConfig, ConversionSummary,
    DocumentKind, MarkdownOptions, PageSeparator, ProcessProgressCallback, ProgressCallback,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that narrates upload → signed URL → OCR and prints retries above
/// itself.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProcessProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, path: &Path, size_bytes: u64) {
        self.bar.set_prefix("Uploading");
        self.bar.set_message(format!(
            "{} ({:.2} MB)",
            path.display(),
            size_bytes as f64 / 1024.0 / 1024.0
        ));
    }

    fn on_upload_complete(&self, file_id: &str) {
        self.bar.println(format!(
            "  {} File uploaded successfully with ID: {}",
            green("✓"),
            file_id
        ));
    }

    fn on_signed_url_start(&self, _file_id: &str) {
        self.bar.set_prefix("Signing");
        self.bar.set_message("requesting signed file URL");
    }

    fn on_ocr_start(&self, kind: DocumentKind) {
        self.bar.set_prefix("OCR");
        self.bar.set_message(format!("processing document (type: {kind})"));
    }

    fn on_ocr_complete(&self, body_len: usize) {
        self.bar.println(format!(
            "  {} OCR complete  {}",
            green("✓"),
            dim(&format!("{body_len} bytes"))
        ));
    }

    fn on_retry(&self, operation: &str, attempt: u32, max_attempts: u32, error: &str) {
        // Truncate very long error bodies to keep output tidy.
        let msg = if error.chars().count() > 100 {
            format!("{}\u{2026}", error.chars().take(99).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {} attempt {}/{} failed: {}",
            yellow("↻"),
            operation,
            attempt,
            max_attempts,
            dim(&msg)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR a local PDF, JSON to stdout
  mistral-ocr process paper.pdf

  # OCR a URL, save JSON with embedded images
  mistral-ocr process https://arxiv.org/pdf/1706.03762 -o out/attention.json --include-images

  # Convert saved JSON, one Markdown file per page
  mistral-ocr convert out/attention.json -d markdown_output

  # Convert into a single file with inlined images
  mistral-ocr convert out/attention.json -o attention.md --images

  # Both steps at once, keeping the intermediate JSON
  mistral-ocr markdown scan.png -j scan.json --single-file

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY     API key (or pass --api-key)
  MISTRAL_BASE_URL    Override the API root
  MISTRAL_OCR_MODEL   Override the OCR model
  RUST_LOG            tracing filter, e.g. mistral_ocr=debug
"#;

/// OCR documents with Mistral AI and convert the results to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "mistral-ocr",
    version,
    about = "OCR tool using Mistral AI",
    long_about = "A CLI tool for performing OCR on documents using Mistral AI.\n\
It can process PDF documents and images and extract text while keeping document structure.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Mistral API key.
    #[arg(long, global = true, env = "MISTRAL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API root URL.
    #[arg(long, global = true, env = "MISTRAL_BASE_URL", default_value = mistral_ocr::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// OCR model identifier.
    #[arg(long, global = true, env = "MISTRAL_OCR_MODEL", default_value = mistral_ocr::config::DEFAULT_MODEL)]
    model: String,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "MISTRAL_OCR_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a document with OCR (local file or URL).
    Process {
        /// PDF, image, or other document; local path or HTTP/HTTPS URL.
        input: String,

        /// Output JSON file path (default is stdout).
        #[arg(short, long)]
        output_file: Option<PathBuf>,

        /// Include base64 encoded images in the output.
        #[arg(long)]
        include_images: bool,
    },

    /// Convert OCR JSON output to Markdown.
    Convert {
        /// JSON file produced by `process`.
        json_file: PathBuf,

        #[command(flatten)]
        markdown: MarkdownArgs,
    },

    /// Process a document and convert the output to Markdown in one step.
    Markdown {
        /// Local path or HTTP/HTTPS URL.
        input: String,

        /// Save the intermediate JSON to this file.
        #[arg(short, long)]
        json_file: Option<PathBuf>,

        #[command(flatten)]
        markdown: MarkdownArgs,
    },

    /// Print the version number.
    Version,
}

#[derive(Args, Debug)]
struct MarkdownArgs {
    /// Directory to store markdown files.
    #[arg(short = 'd', long, default_value = "markdown_output")]
    output_dir: PathBuf,

    /// Output filename for single file mode (implies --single-file).
    #[arg(short, long)]
    output_file: Option<PathBuf>,

    /// Inline images into the markdown as base64 data URIs.
    #[arg(long)]
    images: bool,

    /// Include page break indicators between pages.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    page_breaks: bool,

    /// Page break style: hr, comment, or a custom string.
    #[arg(long, default_value = "hr")]
    separator: String,

    /// Use the file name as document title when metadata has none.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    title_from_filename: bool,

    /// Create a single markdown file instead of one per page.
    #[arg(long)]
    single_file: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers the happy path, so library INFO logs stay quiet
    // unless --verbose is set.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Version => {
            println!("Mistral OCR CLI v{}", env!("CARGO_PKG_VERSION"));
        }

        Command::Process {
            input,
            output_file,
            include_images,
        } => {
            let progress = show_progress(&cli).then(CliProgressCallback::new);
            let config = build_client_config(&cli, progress.clone())?;
            let raw = process(input, &config, *include_images).await;
            if let Some(ref p) = progress {
                p.finish();
            }
            let raw = raw.context("Error processing document")?;

            match output_file {
                Some(path) => {
                    output::write_json(&raw, path)
                        .await
                        .context("Error writing output file")?;
                    if !cli.quiet {
                        eprintln!(
                            "{} OCR results saved to {}",
                            green("✔"),
                            bold(&path.display().to_string())
                        );
                    }
                }
                None => {
                    let pretty = output::pretty_json(&raw).context("Error formatting JSON")?;
                    let stdout = io::stdout();
                    let mut handle = stdout.lock();
                    writeln!(handle, "{pretty}").context("Failed to write to stdout")?;
                }
            }
        }

        Command::Convert {
            json_file,
            markdown,
        } => {
            let options = build_markdown_options(markdown)?;
            let summary = convert_file(json_file, &options)
                .await
                .with_context(|| format!("Error converting {}", json_file.display()))?;
            if !cli.quiet {
                print_summary(&json_file.display().to_string(), &summary);
            }
        }

        Command::Markdown {
            input,
            json_file,
            markdown,
        } => {
            let options = build_markdown_options(markdown)?;
            let progress = show_progress(&cli).then(CliProgressCallback::new);
            let config = build_client_config(&cli, progress.clone())?;
            let result =
                process_to_markdown(input, &config, &options, json_file.as_deref()).await;
            if let Some(ref p) = progress {
                p.finish();
            }
            let summary = result.context("Error processing document")?;

            if !cli.quiet {
                if let Some(path) = json_file {
                    eprintln!("{} OCR results saved to {}", green("✔"), path.display());
                }
                print_summary(input, &summary);
            }
        }
    }

    Ok(())
}

fn show_progress(cli: &Cli) -> bool {
    !cli.quiet && !cli.verbose
}

/// Map global flags to `ClientConfig`.
fn build_client_config(
    cli: &Cli,
    progress: Option<Arc<CliProgressCallback>>,
) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(&cli.base_url)
        .model(&cli.model)
        .timeout_secs(cli.timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb as ProgressCallback);
    }

    builder.build().context("Invalid configuration")
}

/// Map convert flags to `MarkdownOptions`.
fn build_markdown_options(args: &MarkdownArgs) -> Result<MarkdownOptions> {
    let mut builder = MarkdownOptions::builder()
        .output_dir(&args.output_dir)
        .include_images(args.images)
        .page_separator(parse_separator(&args.separator))
        .page_breaks(args.page_breaks)
        .title_from_filename(args.title_from_filename)
        .single_file(args.single_file);

    if let Some(ref file) = args.output_file {
        builder = builder.output_file(file);
    }

    builder.build().context("Invalid output options")
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}

fn print_summary(source: &str, summary: &ConversionSummary) {
    for file in &summary.files {
        eprintln!("  {} {}", green("✓"), dim(&file.display().to_string()));
    }
    eprintln!(
        "{} Converted {} to markdown in {}/  ({} pages)",
        green("✔"),
        bold(source),
        summary.output_dir.display(),
        summary.total_pages
    );
}
