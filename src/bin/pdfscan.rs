//! CLI binary for edgequake-pdfscan.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ScanConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfscan::{
    inspect, transcribe, ImageFormat, ProgressCallback, ScanConfig, ScanProgressCallback,
    TranscriptKind,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while scanning, then a bar over the
/// selected images with one log line per recognition.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Looking for embedded images…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Recognising");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, position: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&position))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ScanProgressCallback for CliProgressCallback {
    fn on_scan_complete(&self, format: ImageFormat, discovered: usize, selected: usize) {
        if selected == 0 {
            self.bar.set_message(format!("no usable images ({discovered} {format} found)"));
            return;
        }
        self.activate_bar(selected);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "{discovered} {format} objects found, recognising {selected}…"
            ))
        ));
    }

    fn on_image_start(&self, position: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(position, Instant::now());
        }
        self.bar.set_message(format!("image {position}"));
    }

    fn on_image_complete(&self, position: usize, total: usize, text_len: usize) {
        let secs = self.elapsed_secs(position);
        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            position,
            total,
            dim(&format!("{text_len:>5} bytes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, position: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(position);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            let mut short: String = error.chars().take(79).collect();
            short.push('…');
            short
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}  {}",
            red("✗"),
            position,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        if total == 0 {
            return;
        }

        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} images recognised",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} images recognised  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Transcribe an uploaded deck and mark record f1739 as synced
  pdfscan uploads/annual-review.pdf f1739

  # Use another knowledge-base root
  pdfscan --data-dir /srv/kb/data deck.pdf 1712345678901

  # See what would be sent, without any API calls or writes
  pdfscan --inspect-only deck.pdf f1739

  # Structured result for scripts
  pdfscan --json --no-progress deck.pdf f1739 > result.json

LAYOUT:
  <data-dir>/knowledge_bases.json    manifest (JSON array of knowledge bases)
  <data-dir>/contents/<file_id>.txt  transcript output

ENVIRONMENT VARIABLES:
  PDFSCAN_API_KEY   Bearer token for the chat-completions endpoint
  RUST_LOG          Overrides the log filter (e.g. edgequake_pdfscan=debug)
"#;

/// Transcribe image-only PDFs with a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdfscan",
    version,
    about = "Transcribe image-only PDFs into knowledge-base text using a Vision LLM",
    long_about = "Find the JPEG (or PNG) images embedded in a PDF, send each one to an \
OpenAI-compatible chat-completions VLM, write the labeled transcript to \
<content-dir>/<file_id>.txt and mark the manifest record as synced.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the image-only PDF.
    source: PathBuf,

    /// Manifest record id; also names the transcript file.
    file_id: String,

    /// Knowledge-base data directory.
    #[arg(long, env = "PDFSCAN_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Transcript directory [default: <data-dir>/contents].
    #[arg(long, env = "PDFSCAN_CONTENT_DIR")]
    content_dir: Option<PathBuf>,

    /// Manifest file [default: <data-dir>/knowledge_bases.json].
    #[arg(long, env = "PDFSCAN_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Chat-completions endpoint URL.
    #[arg(long, env = "PDFSCAN_ENDPOINT")]
    endpoint: Option<String>,

    /// Vision model id.
    #[arg(long, env = "PDFSCAN_MODEL")]
    model: Option<String>,

    /// Bearer token for the endpoint.
    #[arg(long, env = "PDFSCAN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PDFSCAN_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max output tokens per image.
    #[arg(long, env = "PDFSCAN_MAX_TOKENS", default_value_t = 1500)]
    max_tokens: usize,

    /// Per-image API call timeout in seconds.
    #[arg(long, env = "PDFSCAN_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Minimum spacing between consecutive API calls, in milliseconds.
    #[arg(long, env = "PDFSCAN_INTERVAL_MS", default_value_t = 500)]
    interval_ms: u64,

    /// Images of this many bytes or fewer are ignored.
    #[arg(long, env = "PDFSCAN_MIN_IMAGE_BYTES", default_value_t = 10_000)]
    min_image_bytes: usize,

    /// Maximum number of images sent per document.
    #[arg(long, env = "PDFSCAN_MAX_IMAGES", default_value_t = 15)]
    max_images: usize,

    /// Text file with a custom prompt template ({index} and {total} are substituted).
    #[arg(long, env = "PDFSCAN_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Output structured JSON instead of the transcript.
    #[arg(long)]
    json: bool,

    /// List the embedded images only; no API calls, no writes.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFSCAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFSCAN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ScanProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let inventory = inspect(&cli.source, &config)
            .await
            .context("Failed to inspect document")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&inventory).context("Failed to serialise inventory")?
            );
        } else {
            println!("File:         {}", inventory.source);
            println!("Format:       {}", inventory.format);
            println!("Discovered:   {}", inventory.discovered);
            println!("Valid:        {} (> {} bytes)", inventory.valid, config.min_image_bytes);
            println!("Selected:     {}", inventory.selected);
            for img in &inventory.images {
                println!(
                    "  #{:<3} offset {:>10}  {:>9} bytes  {}",
                    img.index,
                    img.offset,
                    img.byte_len,
                    if img.selected { green("send") } else { dim("skip") }
                );
            }
        }
        return Ok(());
    }

    // ── Run transcription ────────────────────────────────────────────────
    let output = transcribe(&cli.source, &cli.file_id, &config)
        .await
        .context("Transcription failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if cli.quiet {
        return Ok(());
    }

    match output.kind {
        TranscriptKind::Placeholder => eprintln!(
            "{}  no usable images; placeholder written  →  {}",
            cyan("⚠"),
            bold(&output.transcript_path.display().to_string()),
        ),
        TranscriptKind::Recognized => {
            eprintln!(
                "{}  {}/{} images  {}ms  →  {}",
                if output.stats.failed_images == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                output.stats.processed_images - output.stats.failed_images,
                output.stats.processed_images,
                output.stats.total_duration_ms,
                bold(&output.transcript_path.display().to_string()),
            );
            if output.manifest_records_updated == 0 {
                eprintln!(
                    "   {}",
                    red(&format!("no manifest record with id '{}'", output.file_id))
                );
            } else {
                eprintln!(
                    "   {}",
                    dim(&format!(
                        "{} manifest record(s) marked synced",
                        output.manifest_records_updated
                    ))
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ScanConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ScanConfig> {
    let mut builder = ScanConfig::builder()
        .data_dir(&cli.data_dir)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .dispatch_interval_ms(cli.interval_ms)
        .min_image_bytes(cli.min_image_bytes)
        .max_images(cli.max_images);

    if let Some(ref dir) = cli.content_dir {
        builder = builder.content_dir(dir);
    }
    if let Some(ref path) = cli.manifest {
        builder = builder.manifest_path(path);
    }
    if let Some(ref url) = cli.endpoint {
        builder = builder.endpoint(url);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref path) = cli.prompt_file {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {:?}", path))?;
        builder = builder.prompt_template(template.trim());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
