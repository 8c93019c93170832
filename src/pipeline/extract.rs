//! Embedded-image discovery: find raw JPEG/PNG streams inside a byte soup.
//!
//! Image-only PDFs produced by slide exporters and scanners usually store
//! each page as a `/DCTDecode` (JPEG) or raw PNG stream. Instead of walking
//! the PDF object graph we scan the file linearly for each format's start
//! marker and take everything up to the *nearest* following end marker.
//!
//! ## Scan contract
//!
//! - Ranges are inclusive of both markers and never overlap.
//! - Start offsets are strictly increasing.
//! - The end marker is the first occurrence at or after the start offset;
//!   there is no nesting or balancing.
//! - A start marker without any later end marker stops the scan for that
//!   format. Well-formed images further in the buffer are not reported.
//!
//! JPEG is scanned first; PNG only when the JPEG pass discovers nothing at
//! all (before any size filtering).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::FusedIterator;
use std::ops::Range;
use tracing::{debug, info, warn};

/// JPEG start-of-image marker followed by the first byte of the next marker.
pub const JPEG_START_MARKER: &[u8] = &[0xFF, 0xD8, 0xFF];

/// JPEG end-of-image marker.
pub const JPEG_END_MARKER: &[u8] = &[0xFF, 0xD9];

/// The fixed 8-byte PNG file signature.
pub const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// `IEND` chunk type plus its constant CRC (`AE 42 60 82`).
pub const PNG_IEND_FOOTER: &[u8] = &[b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82];

/// Raster format family recognised by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Byte sequence that opens a stream of this format.
    pub const fn start_marker(self) -> &'static [u8] {
        match self {
            ImageFormat::Jpeg => JPEG_START_MARKER,
            ImageFormat::Png => PNG_SIGNATURE,
        }
    }

    /// Byte sequence that closes a stream of this format (included in the range).
    pub const fn end_marker(self) -> &'static [u8] {
        match self {
            ImageFormat::Jpeg => JPEG_END_MARKER,
            ImageFormat::Png => PNG_IEND_FOOTER,
        }
    }

    /// MIME type declared to the recognition endpoint.
    pub const fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Jpeg => f.write_str("JPEG"),
            ImageFormat::Png => f.write_str("PNG"),
        }
    }
}

/// A view onto one embedded image inside the source document.
///
/// Holds a borrow of the document, so nothing is copied until the image is
/// selected and encoded for transmission.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage<'a> {
    doc: &'a [u8],
    start: usize,
    end: usize,
    format: ImageFormat,
}

impl<'a> EmbeddedImage<'a> {
    /// Offset of the first start-marker byte.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Offset one past the last end-marker byte.
    pub fn end(&self) -> usize {
        self.end
    }

    /// `[start, end)` within the source document.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Size of the image in bytes, markers included.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// The image bytes, borrowed from the document.
    pub fn bytes(&self) -> &'a [u8] {
        &self.doc[self.start..self.end]
    }
}

impl fmt::Debug for EmbeddedImage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedImage")
            .field("format", &self.format)
            .field("range", &self.range())
            .field("len", &self.len())
            .finish()
    }
}

/// Lazy scanner over the images of one format.
///
/// Cloning the scanner yields an independent cursor, so a scan can be
/// restarted from any point without rescanning the prefix.
#[derive(Debug, Clone)]
pub struct ImageScanner<'a> {
    doc: &'a [u8],
    format: ImageFormat,
    cursor: usize,
    finished: bool,
}

impl<'a> ImageScanner<'a> {
    /// Offset the next search starts from.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl<'a> Iterator for ImageScanner<'a> {
    type Item = EmbeddedImage<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let Some(start) = find_from(self.doc, self.format.start_marker(), self.cursor) else {
            self.finished = true;
            return None;
        };

        let end_marker = self.format.end_marker();
        let Some(end_at) = find_from(self.doc, end_marker, start) else {
            warn!(
                "{} start marker at offset {} has no end marker; stopping {} scan",
                self.format, start, self.format
            );
            self.finished = true;
            return None;
        };

        let end = end_at + end_marker.len();
        self.cursor = end;

        Some(EmbeddedImage {
            doc: self.doc,
            start,
            end,
            format: self.format,
        })
    }
}

impl FusedIterator for ImageScanner<'_> {}

/// Scan `doc` for every embedded image of `format`, in ascending offset order.
pub fn scan(doc: &[u8], format: ImageFormat) -> ImageScanner<'_> {
    ImageScanner {
        doc,
        format,
        cursor: 0,
        finished: false,
    }
}

/// All images discovered for the one format family chosen for this run.
#[derive(Debug, Clone)]
pub struct ImageBatch<'a> {
    /// The family that was used. `Png` also when neither family was found,
    /// since PNG is the last one attempted.
    pub format: ImageFormat,
    /// Every discovered image, before size filtering, in discovery order.
    pub images: Vec<EmbeddedImage<'a>>,
}

impl ImageBatch<'_> {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Discover the images of `doc`, JPEG first with PNG as fallback.
///
/// The fallback is taken only when the JPEG pass discovers zero images; a
/// document whose JPEGs are all icon-sized still uses the JPEG family.
pub fn extract_images(doc: &[u8]) -> ImageBatch<'_> {
    let jpegs: Vec<_> = scan(doc, ImageFormat::Jpeg).collect();
    info!("Found {} JPEG image objects", jpegs.len());
    if !jpegs.is_empty() {
        return ImageBatch {
            format: ImageFormat::Jpeg,
            images: jpegs,
        };
    }

    debug!("No JPEG streams; falling back to PNG scan");
    let pngs: Vec<_> = scan(doc, ImageFormat::Png).collect();
    info!("Found {} PNG image objects", pngs.len());
    ImageBatch {
        format: ImageFormat::Png,
        images: pngs,
    }
}

fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A synthetic JPEG of exactly `len` bytes whose filler contains no 0xFF.
    fn jpeg(len: usize) -> Vec<u8> {
        assert!(len >= 5);
        let mut v = JPEG_START_MARKER.to_vec();
        v.resize(len - JPEG_END_MARKER.len(), b'J');
        v.extend_from_slice(JPEG_END_MARKER);
        v
    }

    fn png(len: usize) -> Vec<u8> {
        assert!(len >= 16);
        let mut v = PNG_SIGNATURE.to_vec();
        v.resize(len - PNG_IEND_FOOTER.len(), b'p');
        v.extend_from_slice(PNG_IEND_FOOTER);
        v
    }

    #[test]
    fn markers_have_expected_lengths() {
        assert_eq!(JPEG_START_MARKER.len(), 3);
        assert_eq!(JPEG_END_MARKER.len(), 2);
        assert_eq!(PNG_SIGNATURE.len(), 8);
        assert_eq!(PNG_IEND_FOOTER.len(), 8);
        assert_eq!(PNG_IEND_FOOTER, b"IEND\xaeB`\x82");
    }

    #[test]
    fn finds_interleaved_jpegs_in_order() {
        let mut doc = b"%PDF-1.4 noise".to_vec();
        let mut expected = Vec::new();
        for len in [40, 120, 64] {
            let start = doc.len();
            doc.extend(jpeg(len));
            expected.push(start..start + len);
            doc.extend_from_slice(b"\nendstream endobj 12 0 obj\n");
        }

        let found: Vec<_> = scan(&doc, ImageFormat::Jpeg).map(|i| i.range()).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn ranges_include_both_markers() {
        let doc = [b"xx".to_vec(), jpeg(30), b"yy".to_vec()].concat();
        let img = scan(&doc, ImageFormat::Jpeg).next().unwrap();
        assert!(img.bytes().starts_with(JPEG_START_MARKER));
        assert!(img.bytes().ends_with(JPEG_END_MARKER));
        assert_eq!(img.len(), 30);
        assert_eq!(img.format(), ImageFormat::Jpeg);
    }

    #[test]
    fn end_marker_is_nearest_not_balanced() {
        // A second SOI inside the first image does not extend it.
        let mut doc = JPEG_START_MARKER.to_vec();
        doc.extend_from_slice(b"aa");
        doc.extend_from_slice(JPEG_START_MARKER);
        doc.extend_from_slice(b"bb");
        doc.extend_from_slice(JPEG_END_MARKER);
        doc.extend_from_slice(b"cc");
        doc.extend_from_slice(JPEG_END_MARKER);

        let found: Vec<_> = scan(&doc, ImageFormat::Jpeg).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range(), 0..12);
    }

    #[test]
    fn end_search_starts_at_the_start_offset() {
        // FF D8 FF D9: the end marker overlaps the start marker's last byte.
        let doc = [0xFF, 0xD8, 0xFF, 0xD9, 0x00];
        let found: Vec<_> = scan(&doc, ImageFormat::Jpeg).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range(), 0..4);
    }

    #[test]
    fn dangling_start_stops_the_scan() {
        let first = jpeg(50);
        let mut doc = first.clone();
        doc.extend_from_slice(b"--");
        // SOI with no EOI anywhere after it...
        doc.extend_from_slice(JPEG_START_MARKER);
        doc.extend_from_slice(&[b'z'; 40]);
        // ...then a PNG, which uses different markers and is never consulted.
        doc.extend(png(32));

        let found: Vec<_> = scan(&doc, ImageFormat::Jpeg).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range(), 0..first.len());
    }

    #[test]
    fn scanner_is_fused_after_dangling_start() {
        let mut doc = jpeg(20);
        doc.extend_from_slice(JPEG_START_MARKER);
        let mut scanner = scan(&doc, ImageFormat::Jpeg);
        assert!(scanner.next().is_some());
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn cloned_scanner_restarts_from_its_cursor() {
        let doc = [jpeg(20), jpeg(25), jpeg(30)].concat();
        let mut scanner = scan(&doc, ImageFormat::Jpeg);
        scanner.next();
        assert_eq!(scanner.cursor(), 20);

        let rest: Vec<_> = scanner.clone().map(|i| i.len()).collect();
        assert_eq!(rest, vec![25, 30]);
        // The original cursor is unaffected by the clone.
        assert_eq!(scanner.next().map(|i| i.len()), Some(25));
    }

    #[test]
    fn empty_and_markerless_buffers_yield_nothing() {
        assert_eq!(scan(&[], ImageFormat::Jpeg).count(), 0);
        assert_eq!(scan(b"plain text", ImageFormat::Png).count(), 0);
        let batch = extract_images(b"%PDF-1.7 no images here");
        assert!(batch.is_empty());
        assert_eq!(batch.format, ImageFormat::Png);
    }

    #[test]
    fn png_used_only_when_no_jpeg_is_discovered() {
        let doc = [png(40), b"gap".to_vec(), png(48)].concat();
        let batch = extract_images(&doc);
        assert_eq!(batch.format, ImageFormat::Png);
        assert_eq!(batch.images.len(), 2);
        assert!(batch.images[1].bytes().starts_with(PNG_SIGNATURE));
        assert!(batch.images[1].bytes().ends_with(PNG_IEND_FOOTER));
    }

    #[test]
    fn tiny_jpegs_still_block_png_fallback() {
        let doc = [jpeg(10), png(20_000)].concat();
        let batch = extract_images(&doc);
        assert_eq!(batch.format, ImageFormat::Jpeg);
        assert_eq!(batch.images.len(), 1);
    }

    #[test]
    fn mime_types() {
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
    }
}
