//! # edgequake-pdfscan
//!
//! Transcribe image-only PDFs (scanned slide decks, photographed reports)
//! into plain text using a Vision Language Model (VLM).
//!
//! ## Why this crate?
//!
//! A slide deck exported as "pictures only" has no text layer, so text
//! extractors return nothing. Rather than rendering pages, this crate scans
//! the raw file bytes for embedded JPEG streams (or PNG streams, when there
//! are no JPEGs), sends each sizeable image to a chat-completions VLM and
//! stitches the answers into one labeled transcript. The transcript is saved
//! under the knowledge-base content directory and the file's manifest record
//! is marked `synced`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Extract   JPEG markers (FFD8FF … FFD9), else PNG signature … IEND
//!  ├─ 2. Select    keep images > 10 000 bytes, at most 15
//!  ├─ 3. Encode    base64 data URLs
//!  ├─ 4. VLM       one call per image, sequential, paced by 500 ms
//!  ├─ 5. Assemble  "===图片N（原始第M个对象）===" blocks
//!  └─ 6. Persist   <content_dir>/<file_id>.txt + manifest status
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfscan::{transcribe, ScanConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key from PDFSCAN_API_KEY
//!     let config = ScanConfig::default();
//!     let output = transcribe("uploads/annual-review.pdf", "f1739", &config).await?;
//!     println!("{}", output.transcript);
//!     eprintln!(
//!         "{}/{} images recognised",
//!         output.stats.processed_images - output.stats.failed_images,
//!         output.stats.processed_images
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfscan` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfscan = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;
pub mod transcribe;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ScanConfig, ScanConfigBuilder};
pub use error::{RecognitionError, ScanError};
pub use manifest::{FileRecord, JsonManifest, ManifestStore};
pub use output::{
    ImageInventory, ImageSummary, RecognitionResult, ScanStats, TranscriptKind,
    TranscriptionOutput,
};
pub use pipeline::extract::{extract_images, ImageFormat};
pub use pipeline::recognize::{HttpRecognizer, RecognitionRequest, Recognizer};
pub use progress::{NoopProgressCallback, ProgressCallback, ScanProgressCallback};
pub use stream::{recognize_stream, RecognitionStream};
pub use transcribe::{inspect, transcribe, transcribe_bytes, transcribe_sync};
