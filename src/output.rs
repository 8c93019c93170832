//! Result types returned by the transcription pipeline.

use crate::error::RecognitionError;
use crate::pipeline::extract::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of recognising one image.
///
/// Failed images keep their slot: `text` holds the bracketed failure marker
/// and `error` holds the cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// 1-based position within the processed batch.
    pub position: usize,
    /// 1-based position among all discovered images of the same format.
    pub original_index: usize,
    /// Size of the processed batch.
    pub total: usize,
    pub format: ImageFormat,
    /// Raw image size in bytes.
    pub byte_len: usize,
    /// Recognised text, or the failure marker.
    pub text: String,
    /// Wall-clock time of the recognition call.
    pub duration_ms: u64,
    pub error: Option<RecognitionError>,
}

impl RecognitionResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Which kind of transcript was persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptKind {
    /// Labeled blocks from recognised images; the manifest entry was marked synced.
    Recognized,
    /// No usable images; the fixed placeholder was written and the manifest left alone.
    Placeholder,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    /// Format family used, if any image was discovered.
    pub format: Option<ImageFormat>,
    /// Images discovered before size filtering.
    pub discovered_images: usize,
    /// Images above the size threshold, before capping.
    pub valid_images: usize,
    /// Images sent for recognition.
    pub processed_images: usize,
    /// Processed images whose recognition failed.
    pub failed_images: usize,
    pub recognition_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything produced by one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionOutput {
    pub file_id: String,
    /// The persisted transcript text.
    pub transcript: String,
    pub transcript_path: PathBuf,
    pub kind: TranscriptKind,
    /// Manifest records whose status was set to `synced`.
    pub manifest_records_updated: usize,
    /// Per-image results in batch order.
    pub results: Vec<RecognitionResult>,
    pub stats: ScanStats,
}

/// One discovered image as reported by [`crate::inspect`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSummary {
    /// 1-based discovery index.
    pub index: usize,
    pub offset: usize,
    pub byte_len: usize,
    /// Whether the image would be sent for recognition.
    pub selected: bool,
}

/// Extraction-only view of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInventory {
    pub source: String,
    pub format: ImageFormat,
    pub discovered: usize,
    pub valid: usize,
    pub selected: usize,
    pub images: Vec<ImageSummary>,
}
