//! Batch selection: drop icon-sized noise, then cap the batch.
//!
//! Slide exports embed logos, bullets and thumbnails as tiny JPEGs next to
//! the full-page renders. Anything at or below the byte threshold is treated
//! as decoration. The cap bounds the cost and duration of one run.

use crate::pipeline::extract::EmbeddedImage;

/// An image chosen for recognition, with both of its sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedImage<'a> {
    /// 1-based position within the selected batch.
    pub position: usize,
    /// 1-based position among all discovered images of the same format.
    pub original_index: usize,
    pub image: EmbeddedImage<'a>,
}

/// Keep images strictly larger than `min_bytes`, then the first `max_images`
/// of those, preserving discovery order.
pub fn select_batch<'a>(
    images: &[EmbeddedImage<'a>],
    min_bytes: usize,
    max_images: usize,
) -> Vec<SelectedImage<'a>> {
    images
        .iter()
        .enumerate()
        .filter(|(_, img)| img.len() > min_bytes)
        .take(max_images)
        .enumerate()
        .map(|(pos, (orig, img))| SelectedImage {
            position: pos + 1,
            original_index: orig + 1,
            image: *img,
        })
        .collect()
}

/// Number of images that pass the size filter, before capping.
pub fn count_valid(images: &[EmbeddedImage<'_>], min_bytes: usize) -> usize {
    images.iter().filter(|img| img.len() > min_bytes).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::{scan, ImageFormat, JPEG_END_MARKER, JPEG_START_MARKER};

    fn doc_with_sizes(sizes: &[usize]) -> Vec<u8> {
        let mut doc = Vec::new();
        for &len in sizes {
            doc.extend_from_slice(JPEG_START_MARKER);
            doc.resize(doc.len() + len - 5, b'.');
            doc.extend_from_slice(JPEG_END_MARKER);
            doc.extend_from_slice(b" obj ");
        }
        doc
    }

    #[test]
    fn threshold_is_exclusive() {
        let doc = doc_with_sizes(&[10_000, 10_001]);
        let images: Vec<_> = scan(&doc, ImageFormat::Jpeg).collect();
        let selected = select_batch(&images, 10_000, 15);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].image.len(), 10_001);
        assert_eq!(selected[0].position, 1);
        assert_eq!(selected[0].original_index, 2);
    }

    #[test]
    fn caps_after_filtering_and_keeps_order() {
        // 20 images, every fourth one is an icon.
        let sizes: Vec<usize> = (0..20)
            .map(|i| if i % 4 == 0 { 500 } else { 12_000 + i })
            .collect();
        let doc = doc_with_sizes(&sizes);
        let images: Vec<_> = scan(&doc, ImageFormat::Jpeg).collect();
        assert_eq!(images.len(), 20);
        assert_eq!(count_valid(&images, 10_000), 15);

        let selected = select_batch(&images, 10_000, 15);
        assert_eq!(selected.len(), 15);
        assert!(selected.iter().all(|s| s.image.len() > 10_000));
        let positions: Vec<_> = selected.iter().map(|s| s.position).collect();
        assert_eq!(positions, (1..=15).collect::<Vec<_>>());
        let originals: Vec<_> = selected.iter().map(|s| s.original_index).collect();
        assert!(originals.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(originals[0], 2);
    }

    #[test]
    fn cap_truncates_large_batches() {
        let doc = doc_with_sizes(&[11_000; 18]);
        let images: Vec<_> = scan(&doc, ImageFormat::Jpeg).collect();
        let selected = select_batch(&images, 10_000, 15);
        assert_eq!(selected.len(), 15);
        assert_eq!(selected.last().map(|s| s.original_index), Some(15));
    }

    #[test]
    fn empty_input() {
        assert!(select_batch(&[], 10_000, 15).is_empty());
    }
}
