//! Eager (whole-run) transcription entry points.
//!
//! A run is one linear pass: read → extract → select → recognise →
//! assemble → persist. There is a single branch at the end. A non-empty
//! transcript is written and the manifest record is marked `synced`; an
//! empty one (no usable images in either format) is replaced by a fixed
//! placeholder and the manifest is left alone.

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::manifest::{JsonManifest, ManifestStore, STATUS_SYNCED};
use crate::output::{
    ImageInventory, ImageSummary, RecognitionResult, ScanStats, TranscriptKind,
    TranscriptionOutput,
};
use crate::pipeline::input::RawDocument;
use crate::pipeline::recognize::{HttpRecognizer, Recognizer};
use crate::pipeline::{assemble, encode, extract, input, select};
use crate::prompts::placeholder_transcript;
use crate::stream::recognize_stream;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Transcribe the embedded images of a file on disk.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `source`  — path to the image-only PDF (or any binary blob)
/// * `file_id` — manifest record id; also names `<content_dir>/<file_id>.txt`
/// * `config`  — run configuration
///
/// # Returns
/// `Ok(TranscriptionOutput)` whenever a transcript was written, even if
/// some (or all) images failed recognition.
///
/// # Errors
/// Returns `Err(ScanError)` only for setup-level failures:
/// - source file missing or unreadable
/// - manifest missing, unparsable or unwritable
/// - transcript not writable
/// - images found but no recogniser configured
pub async fn transcribe(
    source: impl AsRef<Path>,
    file_id: &str,
    config: &ScanConfig,
) -> Result<TranscriptionOutput, ScanError> {
    let source = source.as_ref();
    info!("Starting transcription: {} → {}", source.display(), file_id);
    validate_file_id(file_id)?;

    let doc = input::read_document(source).await?;
    run(&doc, file_id, config).await
}

/// Transcribe a document that is already in memory.
///
/// `source_name` is only used in the placeholder message.
pub async fn transcribe_bytes(
    bytes: &[u8],
    source_name: &str,
    file_id: &str,
    config: &ScanConfig,
) -> Result<TranscriptionOutput, ScanError> {
    validate_file_id(file_id)?;
    let doc = RawDocument::from_bytes(source_name, bytes.to_vec());
    run(&doc, file_id, config).await
}

/// Synchronous wrapper around [`transcribe`].
///
/// Creates a temporary tokio runtime internally.
pub fn transcribe_sync(
    source: impl AsRef<Path>,
    file_id: &str,
    config: &ScanConfig,
) -> Result<TranscriptionOutput, ScanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ScanError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(transcribe(source, file_id, config))
}

/// Report what extraction would find, without any network calls or writes.
pub async fn inspect(
    source: impl AsRef<Path>,
    config: &ScanConfig,
) -> Result<ImageInventory, ScanError> {
    let doc = input::read_document(source.as_ref()).await?;
    let batch = extract::extract_images(doc.bytes());
    let selected = select::select_batch(&batch.images, config.min_image_bytes, config.max_images);
    let chosen: Vec<usize> = selected.iter().map(|s| s.original_index).collect();

    let images = batch
        .images
        .iter()
        .enumerate()
        .map(|(i, img)| ImageSummary {
            index: i + 1,
            offset: img.start(),
            byte_len: img.len(),
            selected: chosen.contains(&(i + 1)),
        })
        .collect();

    Ok(ImageInventory {
        source: doc.name().to_string(),
        format: batch.format,
        discovered: batch.images.len(),
        valid: select::count_valid(&batch.images, config.min_image_bytes),
        selected: selected.len(),
        images,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    doc: &RawDocument,
    file_id: &str,
    config: &ScanConfig,
) -> Result<TranscriptionOutput, ScanError> {
    let total_start = Instant::now();
    let source_name = doc.name();
    if doc.is_empty() {
        warn!("'{}' is empty", doc.path().display());
    }
    debug!("Scanning {} bytes of {}", doc.len(), doc.path().display());

    // ── Step 1: Extract ──────────────────────────────────────────────────
    let batch = extract::extract_images(doc.bytes());
    let discovered = batch.images.len();

    // ── Step 2: Filter + cap ─────────────────────────────────────────────
    let valid = select::count_valid(&batch.images, config.min_image_bytes);
    let selected = select::select_batch(&batch.images, config.min_image_bytes, config.max_images);
    info!(
        "{} {} objects, {} valid (>{} bytes), {} selected",
        discovered,
        batch.format,
        valid,
        config.min_image_bytes,
        selected.len()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_scan_complete(batch.format, discovered, selected.len());
    }

    // ── Step 3: Recognise ────────────────────────────────────────────────
    let recognition_start = Instant::now();
    let results: Vec<RecognitionResult> = if selected.is_empty() {
        Vec::new()
    } else {
        let recognizer = resolve_recognizer(config)?;
        let encoded = encode::encode_batch(&selected);
        recognize_stream(encoded, recognizer, config).collect().await
    };
    let recognition_duration_ms = recognition_start.elapsed().as_millis() as u64;

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(results.len(), results.len() - failed);
    }

    // ── Step 4: Assemble + persist ───────────────────────────────────────
    let transcript = assemble::assemble_transcript(&results);
    let transcript_path = config.content_dir().join(format!("{file_id}.txt"));

    let (transcript, kind, manifest_records_updated) = if transcript.is_empty() {
        warn!("No extractable content in '{}'; writing placeholder", source_name);
        let placeholder = placeholder_transcript(source_name);
        write_transcript(&transcript_path, &placeholder).await?;
        (placeholder, TranscriptKind::Placeholder, 0)
    } else {
        write_transcript(&transcript_path, &transcript).await?;
        info!(
            "Saved {} chars → {}",
            transcript.chars().count(),
            transcript_path.display()
        );

        let manifest = resolve_manifest(config);
        let updated = manifest.set_status(file_id, STATUS_SYNCED).await?;
        if updated == 0 {
            warn!("No manifest record matches file id '{}'", file_id);
        }
        (transcript, TranscriptKind::Recognized, updated)
    };

    let stats = ScanStats {
        format: (discovered > 0).then_some(batch.format),
        discovered_images: discovered,
        valid_images: valid,
        processed_images: results.len(),
        failed_images: failed,
        recognition_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Transcription complete: {}/{} images recognised, {}ms total",
        stats.processed_images - stats.failed_images,
        stats.processed_images,
        stats.total_duration_ms
    );

    Ok(TranscriptionOutput {
        file_id: file_id.to_string(),
        transcript,
        transcript_path,
        kind,
        manifest_records_updated,
        results,
        stats,
    })
}

/// Resolve the recogniser, from most-specific to least-specific.
///
/// 1. **Pre-built recogniser** (`config.recognizer`) — used as-is.
/// 2. **HTTP endpoint** — `config.endpoint` with the API key from the config
///    or the `PDFSCAN_API_KEY` environment variable.
///
/// Only called when there is at least one image to send, so a document with
/// no usable images never needs credentials.
fn resolve_recognizer(config: &ScanConfig) -> Result<Arc<dyn Recognizer>, ScanError> {
    if let Some(ref recognizer) = config.recognizer {
        return Ok(Arc::clone(recognizer));
    }

    let api_key = config
        .resolve_api_key()
        .ok_or_else(|| ScanError::RecognizerNotConfigured {
            hint: format!(
                "No API key for {}.\nSet {} or pass --api-key.",
                config.endpoint,
                crate::config::API_KEY_ENV
            ),
        })?;

    let recognizer = HttpRecognizer::from_config(config, api_key)?;
    debug!("Using HTTP recogniser {} ({})", config.endpoint, recognizer.model());
    Ok(Arc::new(recognizer))
}

fn resolve_manifest(config: &ScanConfig) -> Arc<dyn ManifestStore> {
    match config.manifest {
        Some(ref store) => Arc::clone(store),
        None => Arc::new(JsonManifest::open(config.manifest_path())),
    }
}

/// Write the transcript atomically (temp file + rename).
async fn write_transcript(path: &Path, text: &str) -> Result<(), ScanError> {
    let write_err = |e: std::io::Error| ScanError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path: PathBuf = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, text).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}

/// The id becomes a file name, so it must not escape the content directory.
fn validate_file_id(file_id: &str) -> Result<(), ScanError> {
    let bad = file_id.trim().is_empty()
        || file_id == "."
        || file_id == ".."
        || file_id.contains(['/', '\\', '\0']);
    if bad {
        return Err(ScanError::InvalidFileId {
            file_id: file_id.to_string(),
        });
    }
    Ok(())
}
