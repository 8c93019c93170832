//! Transcript assembly: labeled per-image blocks joined in batch order.
//!
//! Every processed image contributes a block, whether or not recognition
//! succeeded; failed images carry their marker text. The header names both
//! the batch position and the original discovery index so a reader can map
//! a block back to the image object in the source file.

use crate::output::RecognitionResult;

/// Header line for one block, e.g. `===图片2（原始第5个对象）===`.
pub fn block_header(position: usize, original_index: usize) -> String {
    format!("===图片{position}（原始第{original_index}个对象）===")
}

/// One block: blank separator, header, text, newline.
pub fn label_block(result: &RecognitionResult) -> String {
    format!(
        "\n{}\n{}\n",
        block_header(result.position, result.original_index),
        result.text
    )
}

/// Concatenate the blocks of all results and trim surrounding whitespace.
///
/// Returns an empty string only when `results` is empty.
pub fn assemble_transcript(results: &[RecognitionResult]) -> String {
    let mut all = String::new();
    for result in results {
        all.push_str(&label_block(result));
    }
    all.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecognitionError;
    use crate::pipeline::extract::ImageFormat;
    use crate::prompts::failure_marker;

    fn result(position: usize, original_index: usize, text: &str) -> RecognitionResult {
        RecognitionResult {
            position,
            original_index,
            total: 3,
            format: ImageFormat::Jpeg,
            byte_len: 20_000,
            text: text.to_string(),
            duration_ms: 5,
            error: None,
        }
    }

    #[test]
    fn header_format() {
        assert_eq!(block_header(1, 4), "===图片1（原始第4个对象）===");
    }

    #[test]
    fn blocks_are_ordered_and_trimmed() {
        let mut failed = result(2, 3, "");
        let err = RecognitionError::Transport {
            detail: "connection reset".into(),
        };
        failed.text = failure_marker(&err);
        failed.error = Some(err);

        let results = vec![result(1, 1, "  第一页  "), failed, result(3, 6, "第三页\n")];
        let t = assemble_transcript(&results);

        assert_eq!(
            t,
            "===图片1（原始第1个对象）===\n  第一页  \n\n\
             ===图片2（原始第3个对象）===\n[识别失败: transport error: connection reset]\n\n\
             ===图片3（原始第6个对象）===\n第三页"
        );
    }

    #[test]
    fn empty_text_still_yields_a_block() {
        let t = assemble_transcript(&[result(1, 2, "")]);
        assert_eq!(t, "===图片1（原始第2个对象）===");
    }

    #[test]
    fn no_results_no_transcript() {
        assert!(assemble_transcript(&[]).is_empty());
    }
}
