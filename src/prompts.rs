//! Fixed text used by the pipeline: the recognition prompt, the per-image
//! failure marker and the placeholder transcript.
//!
//! Keeping every user-visible string here means the wording can change in
//! exactly one place, and tests can inspect it without a live endpoint.
//! Callers can override the prompt via
//! [`crate::config::ScanConfig::prompt_template`].

use crate::error::RecognitionError;

/// Default text prompt sent alongside every image.
///
/// `{index}` is replaced with the image's 1-based position in the batch,
/// `{total}` with the batch size.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "这是PPT年终总结第{index}张图（共{total}张）。请提取图中所有文字，包括标题、正文要点、数据。结构化输出，只输出内容本身。";

/// Fill in the `{index}` / `{total}` placeholders of a prompt template.
pub fn render_prompt(template: &str, index: usize, total: usize) -> String {
    template
        .replace("{index}", &index.to_string())
        .replace("{total}", &total.to_string())
}

/// Text that replaces the recognised content of a failed image.
pub fn failure_marker(error: &RecognitionError) -> String {
    format!("[识别失败: {error}]")
}

/// Transcript written when no image content could be recovered at all.
pub fn placeholder_transcript(source_name: &str) -> String {
    format!(
        "[PDF文件\"{source_name}\"为图片型文档，无法提取文字内容。请尝试上传带有可复制文字的PDF版本，或上传.txt/.md格式的文档。]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_renders_position_and_total() {
        let p = render_prompt(DEFAULT_PROMPT_TEMPLATE, 3, 12);
        assert!(p.contains("第3张图（共12张）"), "got: {p}");
        assert!(!p.contains('{'));
    }

    #[test]
    fn failure_marker_is_bracketed_and_carries_the_error() {
        let m = failure_marker(&RecognitionError::Timeout { secs: 60 });
        assert!(m.starts_with('[') && m.ends_with(']'));
        assert!(m.contains("timed out after 60s"));
    }

    #[test]
    fn placeholder_names_the_source_file() {
        let p = placeholder_transcript("年终总结.pdf");
        assert!(p.contains("\"年终总结.pdf\""));
        assert_eq!(p.trim(), p);
    }
}
