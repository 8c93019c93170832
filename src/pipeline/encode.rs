//! Image encoding: selected `EmbeddedImage` → owned base64 payload.
//!
//! Chat-completions style VLM APIs accept images as base64 data-URLs inside
//! the JSON request body. The embedded bytes are sent as-is; no re-encoding
//! or resizing is done, so the declared MIME type is the scanned format.
//! This is the first point where image bytes are copied out of the document.

use crate::pipeline::extract::ImageFormat;
use crate::pipeline::select::SelectedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Base64 image data plus the MIME type it is declared as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub data: String,
    pub mime_type: &'static str,
}

impl ImagePayload {
    /// `data:<mime>;base64,<data>` for the `image_url` content part.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// A selected image detached from the source buffer, ready to be sent.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub position: usize,
    pub original_index: usize,
    pub format: ImageFormat,
    /// Size of the raw image, before base64 expansion.
    pub byte_len: usize,
    pub payload: ImagePayload,
}

/// Encode one selected image.
pub fn encode_image(selected: &SelectedImage<'_>) -> EncodedImage {
    let bytes = selected.image.bytes();
    let data = STANDARD.encode(bytes);
    debug!(
        "Encoded image #{} → {} bytes base64",
        selected.original_index,
        data.len()
    );

    EncodedImage {
        position: selected.position,
        original_index: selected.original_index,
        format: selected.image.format(),
        byte_len: bytes.len(),
        payload: ImagePayload {
            data,
            mime_type: selected.image.format().mime_type(),
        },
    }
}

/// Encode a whole batch, preserving order.
pub fn encode_batch(selected: &[SelectedImage<'_>]) -> Vec<EncodedImage> {
    selected.iter().map(encode_image).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::{scan, PNG_IEND_FOOTER, PNG_SIGNATURE};
    use crate::pipeline::select::select_batch;

    #[test]
    fn encode_png_roundtrips_bytes_and_mime() {
        let mut doc = b"junk".to_vec();
        doc.extend_from_slice(PNG_SIGNATURE);
        doc.extend_from_slice(&[7u8; 64]);
        doc.extend_from_slice(PNG_IEND_FOOTER);

        let images: Vec<_> = scan(&doc, ImageFormat::Png).collect();
        let selected = select_batch(&images, 0, 15);
        let encoded = encode_batch(&selected);

        assert_eq!(encoded.len(), 1);
        let e = &encoded[0];
        assert_eq!(e.payload.mime_type, "image/png");
        assert_eq!(e.byte_len, 80);
        let decoded = STANDARD.decode(&e.payload.data).expect("valid base64");
        assert_eq!(decoded, &doc[4..]);
        assert!(e.payload.data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }
}
