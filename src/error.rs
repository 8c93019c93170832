//! Error types for the edgequake-pdfscan library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ScanError`] — **Fatal**: the run cannot proceed at all (unreadable
//!   source file, unreadable or unwritable manifest, recogniser not
//!   configured). Returned as `Err(ScanError)` from the top-level
//!   `transcribe*` functions.
//!
//! * [`RecognitionError`] — **Non-fatal**: a single image failed (timeout,
//!   HTTP error, malformed response) but every other image is still sent.
//!   Stored inside [`crate::output::RecognitionResult`] and rendered into the
//!   transcript as a bracketed marker.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfscan library.
///
/// Per-image failures use [`RecognitionError`] and are stored in
/// [`crate::output::RecognitionResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Source document was not found at the given path.
    #[error("Source file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading the source document.
    #[error("Failed to read source file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record identifier cannot be used as a transcript file name.
    #[error("Invalid file id '{file_id}': must be non-empty and contain no path separators")]
    InvalidFileId { file_id: String },

    // ── Manifest errors ───────────────────────────────────────────────────
    /// The manifest file could not be read.
    #[error("Failed to read manifest '{path}': {source}")]
    ManifestReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest file is not a JSON array of knowledge bases.
    #[error("Manifest '{path}' is not valid: {source}")]
    ManifestParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The manifest file could not be rewritten.
    #[error("Failed to write manifest '{path}': {source}")]
    ManifestWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the transcript file.
    #[error("Failed to write transcript '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Recognition errors ────────────────────────────────────────────────
    /// Images were found but no recogniser could be built (missing API key etc.).
    #[error("Recognition endpoint is not configured.\n{hint}")]
    RecognizerNotConfigured { hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// The pipeline never aborts on one of these; the error's `Display` text is
/// embedded in the transcript in place of the recognised text.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum RecognitionError {
    /// The call did not complete within the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Connection, TLS or body-transfer failure.
    #[error("transport error: {detail}")]
    Transport { detail: String },

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The body was not JSON or lacked `choices[0].message.content`.
    #[error("malformed response: {detail}")]
    MalformedResponse { detail: String },
}
