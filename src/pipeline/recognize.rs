//! Image recognition: send one image to the vision model, get text back.
//!
//! The recogniser is the only stage with network I/O. It sits behind the
//! [`Recognizer`] trait so tests and alternative providers can stand in for
//! the HTTP endpoint. [`recognize_image`] wraps any recogniser with the
//! per-call timeout and converts every failure into a [`RecognitionResult`]
//! carrying a bracketed marker, so one bad image never aborts the batch.

use crate::config::ScanConfig;
use crate::error::{RecognitionError, ScanError};
use crate::output::RecognitionResult;
use crate::pipeline::encode::{EncodedImage, ImagePayload};
use crate::prompts::{failure_marker, render_prompt};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything a recogniser needs for one image.
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub payload: ImagePayload,
    /// Rendered text prompt.
    pub prompt: String,
    /// 1-based position within the batch.
    pub position: usize,
    /// Batch size.
    pub total: usize,
}

/// External text-recognition collaborator.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Return the text recognised in the request's image.
    async fn recognize(&self, request: &RecognitionRequest) -> Result<String, RecognitionError>;
}

/// Recogniser backed by an OpenAI-compatible chat-completions endpoint.
pub struct HttpRecognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    timeout_secs: u64,
}

impl HttpRecognizer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: usize,
        timeout: Duration,
    ) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            max_tokens,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Build from a config, using the bearer token that was resolved for it.
    pub fn from_config(config: &ScanConfig, api_key: impl Into<String>) -> Result<Self, ScanError> {
        Self::new(
            config.endpoint.clone(),
            api_key,
            config.model.clone(),
            config.temperature,
            config.max_tokens,
            config.api_timeout(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_body<'a>(&'a self, request: &'a RecognitionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [UserMessage {
                role: "user",
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: request.payload.data_url(),
                        },
                    },
                    ContentPart::Text {
                        text: &request.prompt,
                    },
                ],
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn map_transport(&self, e: reqwest::Error) -> RecognitionError {
        if e.is_timeout() {
            RecognitionError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            RecognitionError::Transport {
                detail: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<String, RecognitionError> {
        let body = self.build_body(request);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            return Err(RecognitionError::Http {
                status: status.as_u16(),
                body: truncate(&text, 300),
            });
        }

        parse_content(&text)
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [UserMessage<'a>; 1],
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    ImageUrl { image_url: ImageUrl },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Pull `choices[0].message.content` out of a response body.
fn parse_content(body: &str) -> Result<String, RecognitionError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| RecognitionError::MalformedResponse {
            detail: format!("{e}: {}", truncate(body, 300)),
        })?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| RecognitionError::MalformedResponse {
            detail: "response has no choices".into(),
        })
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

// ── Per-image driver ─────────────────────────────────────────────────────

/// Recognise one encoded image.
///
/// Always returns a `RecognitionResult` — never propagates the error upward.
/// A failed or timed-out call yields the failure marker as its text.
pub async fn recognize_image(
    recognizer: &dyn Recognizer,
    image: EncodedImage,
    total: usize,
    prompt_template: &str,
    timeout: Duration,
) -> RecognitionResult {
    let start = Instant::now();
    info!(
        "[{}/{}] Recognising image object #{} ({}KB)",
        image.position,
        total,
        image.original_index,
        image.byte_len / 1024
    );

    let EncodedImage {
        position,
        original_index,
        format,
        byte_len,
        payload,
    } = image;

    let request = RecognitionRequest {
        payload,
        prompt: render_prompt(prompt_template, position, total),
        position,
        total,
    };

    let outcome = match tokio::time::timeout(timeout, recognizer.recognize(&request)).await {
        Ok(result) => result,
        Err(_) => Err(RecognitionError::Timeout {
            secs: timeout.as_secs(),
        }),
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    let (text, error) = match outcome {
        Ok(text) => {
            debug!(
                "Image {}: {} chars in {}ms: {}",
                position,
                text.chars().count(),
                duration_ms,
                preview(&text)
            );
            (text, None)
        }
        Err(e) => {
            warn!("Image {}: recognition failed — {}", position, e);
            (failure_marker(&e), Some(e))
        }
    };

    RecognitionResult {
        position,
        original_index,
        total,
        format,
        byte_len,
        text,
        duration_ms,
        error,
    }
}

fn preview(text: &str) -> String {
    text.chars()
        .take(80)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}
