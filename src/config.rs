//! Configuration types for image-only PDF transcription.
//!
//! All run behaviour is controlled through [`ScanConfig`], built via its
//! [`ScanConfigBuilder`]. Every knob lives in one struct so a run can be
//! logged and reproduced from its config alone.

use crate::error::ScanError;
use crate::manifest::ManifestStore;
use crate::pipeline::recognize::Recognizer;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_PROMPT_TEMPLATE;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default recognition endpoint (OpenAI-compatible chat completions).
pub const DEFAULT_ENDPOINT: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "glm-4v-flash";

/// Environment variable consulted for the bearer token when none is configured.
pub const API_KEY_ENV: &str = "PDFSCAN_API_KEY";

/// Configuration for a transcription run.
///
/// Built via [`ScanConfig::builder()`] or using [`ScanConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfscan::ScanConfig;
///
/// let config = ScanConfig::builder()
///     .data_dir("./data")
///     .model("glm-4v-flash")
///     .max_images(10)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ScanConfig {
    /// Root of the knowledge-base data. Default: `./data`.
    pub data_dir: PathBuf,

    /// Transcript directory. Default: `<data_dir>/contents`.
    pub content_dir: Option<PathBuf>,

    /// Manifest file. Default: `<data_dir>/knowledge_bases.json`.
    pub manifest_path: Option<PathBuf>,

    /// Pre-constructed manifest store. Takes precedence over `manifest_path`.
    pub manifest: Option<Arc<dyn ManifestStore>>,

    /// Chat-completions endpoint URL.
    pub endpoint: String,

    /// Vision model identifier. Default: `glm-4v-flash`.
    pub model: String,

    /// Bearer token. If None, [`API_KEY_ENV`] is read when a recogniser is needed.
    pub api_key: Option<String>,

    /// Pre-constructed recogniser. Takes precedence over `endpoint`/`api_key`.
    pub recognizer: Option<Arc<dyn Recognizer>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Transcription wants the model to be faithful to what it sees; low
    /// temperature keeps it from paraphrasing.
    pub temperature: f32,

    /// Maximum output tokens per image. Default: 1500.
    pub max_tokens: usize,

    /// Per-call timeout in seconds. Default: 60.
    ///
    /// The only bound on a stuck call; there is no cancellation otherwise.
    pub api_timeout_secs: u64,

    /// Minimum gap between the end of one call and the next dispatch, in
    /// milliseconds. Default: 500. Zero disables pacing.
    pub dispatch_interval_ms: u64,

    /// Images of this size or smaller are treated as icons. Default: 10 000.
    pub min_image_bytes: usize,

    /// Maximum images recognised per run. Default: 15.
    pub max_images: usize,

    /// Custom prompt template with `{index}` and `{total}` placeholders.
    /// If None, uses [`DEFAULT_PROMPT_TEMPLATE`].
    pub prompt_template: Option<String>,

    /// Optional per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            content_dir: None,
            manifest_path: None,
            manifest: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            recognizer: None,
            temperature: 0.1,
            max_tokens: 1500,
            api_timeout_secs: 60,
            dispatch_interval_ms: 500,
            min_image_bytes: 10_000,
            max_images: 15,
            prompt_template: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("data_dir", &self.data_dir)
            .field("content_dir", &self.content_dir())
            .field("manifest_path", &self.manifest_path())
            .field("manifest", &self.manifest.as_ref().map(|_| "<dyn ManifestStore>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("recognizer", &self.recognizer.as_ref().map(|_| "<dyn Recognizer>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("dispatch_interval_ms", &self.dispatch_interval_ms)
            .field("min_image_bytes", &self.min_image_bytes)
            .field("max_images", &self.max_images)
            .finish()
    }
}

impl ScanConfig {
    /// Create a new builder for `ScanConfig`.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory transcripts are written to.
    pub fn content_dir(&self) -> PathBuf {
        self.content_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("contents"))
    }

    /// Location of the knowledge-base manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("knowledge_bases.json"))
    }

    pub fn prompt_template(&self) -> &str {
        self.prompt_template
            .as_deref()
            .unwrap_or(DEFAULT_PROMPT_TEMPLATE)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }

    /// The configured API key, else the value of [`API_KEY_ENV`].
    pub fn resolve_api_key(&self) -> Option<String> {
        pick_api_key(self.api_key.as_deref(), std::env::var(API_KEY_ENV).ok())
    }
}

fn pick_api_key(configured: Option<&str>, from_env: Option<String>) -> Option<String> {
    configured
        .map(str::to_string)
        .or(from_env)
        .filter(|k| !k.trim().is_empty())
}

/// Builder for [`ScanConfig`].
#[derive(Debug)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn content_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.content_dir = Some(dir.into());
        self
    }

    pub fn manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.manifest_path = Some(path.into());
        self
    }

    pub fn manifest(mut self, store: Arc<dyn ManifestStore>) -> Self {
        self.config.manifest = Some(store);
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn dispatch_interval_ms(mut self, ms: u64) -> Self {
        self.config.dispatch_interval_ms = ms;
        self
    }

    pub fn min_image_bytes(mut self, n: usize) -> Self {
        self.config.min_image_bytes = n;
        self
    }

    pub fn max_images(mut self, n: usize) -> Self {
        self.config.max_images = n;
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScanConfig, ScanError> {
        let c = &self.config;
        if c.max_images == 0 {
            return Err(ScanError::InvalidConfig("max_images must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ScanError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(ScanError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if !c.prompt_template().contains("{index}") {
            return Err(ScanError::InvalidConfig(
                "prompt template must contain an {index} placeholder".into(),
            ));
        }
        let is_http = c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://");
        if c.recognizer.is_none() && !is_http {
            return Err(ScanError::InvalidConfig(format!(
                "endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let c = ScanConfig::default();
        assert_eq!(c.min_image_bytes, 10_000);
        assert_eq!(c.max_images, 15);
        assert_eq!(c.api_timeout(), Duration::from_secs(60));
        assert_eq!(c.dispatch_interval(), Duration::from_millis(500));
        assert_eq!(c.max_tokens, 1500);
        assert_eq!(c.model, "glm-4v-flash");
        assert_eq!(c.content_dir(), PathBuf::from("./data/contents"));
        assert_eq!(c.manifest_path(), PathBuf::from("./data/knowledge_bases.json"));
    }

    #[test]
    fn explicit_paths_override_data_dir() {
        let c = ScanConfig::builder()
            .data_dir("/srv/kb")
            .content_dir("/tmp/out")
            .build()
            .unwrap();
        assert_eq!(c.content_dir(), PathBuf::from("/tmp/out"));
        assert_eq!(c.manifest_path(), PathBuf::from("/srv/kb/knowledge_bases.json"));
    }

    #[test]
    fn zero_cap_is_rejected() {
        let err = ScanConfig::builder().max_images(0).build().unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }

    #[test]
    fn template_without_index_is_rejected() {
        let err = ScanConfig::builder()
            .prompt_template("read this image")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("{index}"));
    }

    #[test]
    fn temperature_is_clamped() {
        let c = ScanConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn api_key_prefers_config_and_ignores_blank_values() {
        assert_eq!(
            pick_api_key(Some("cfg"), Some("env".into())).as_deref(),
            Some("cfg")
        );
        assert_eq!(pick_api_key(None, Some("env".into())).as_deref(), Some("env"));
        assert_eq!(pick_api_key(None, Some("  ".into())), None);
        assert_eq!(pick_api_key(None, None), None);
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ScanConfig::builder().api_key("secret-token").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-token"));
        assert!(dbg.contains("<redacted>"));
    }
}
