//! Input resolution: read the source document into memory.
//!
//! The whole file is read at once; extraction only needs a byte slice. No
//! PDF validation happens here — a file without a `%PDF` header is still
//! scanned, since the scanner does not depend on the container format.

use crate::error::ScanError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The full, immutable content of a source file.
#[derive(Debug, Clone)]
pub struct RawDocument {
    path: PathBuf,
    name: String,
    bytes: Vec<u8>,
}

impl RawDocument {
    /// Wrap bytes that did not come from disk.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used in the placeholder transcript.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Read a source document, mapping I/O failures to fatal errors.
pub async fn read_document(path: &Path) -> Result<RawDocument, ScanError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ScanError::FileNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => ScanError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ScanError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    if !bytes.starts_with(b"%PDF") {
        warn!(
            "'{}' does not start with a %PDF header; scanning it anyway",
            path.display()
        );
    }
    debug!("Read {} bytes from {}", bytes.len(), path.display());

    Ok(RawDocument {
        path: path.to_path_buf(),
        name: display_name(path),
        bytes,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_bytes_and_base_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("年终总结.pdf");
        tokio::fs::write(&path, b"%PDF-1.4\nbody").await.unwrap();

        let doc = read_document(&path).await.unwrap();
        assert_eq!(doc.name(), "年终总结.pdf");
        assert_eq!(doc.bytes(), b"%PDF-1.4\nbody");
        assert_eq!(doc.path(), path.as_path());
    }

    #[tokio::test]
    async fn non_pdf_content_is_still_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.bin");
        tokio::fs::write(&path, b"GIF89a").await.unwrap();
        assert_eq!(read_document(&path).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = read_document(&dir.path().join("nope.pdf")).await.unwrap_err();
        assert!(matches!(err, ScanError::FileNotFound { .. }));
    }

    #[test]
    fn from_bytes_uses_given_name() {
        let doc = RawDocument::from_bytes("upload.pdf", vec![1, 2, 3]);
        assert_eq!(doc.name(), "upload.pdf");
        assert_eq!(doc.len(), 3);
    }
}
