//! Streaming recognition API: emit results as each image completes.
//!
//! Images are recognised strictly one at a time, in batch order. Between
//! calls the configured [`DispatchPolicy`](crate::pipeline::pacing::DispatchPolicy)
//! decides when the next dispatch may happen. Ordering comes from the
//! sequential iteration itself, so results arrive already sorted by
//! `position`.
//!
//! The eager [`crate::transcribe::transcribe`] collects this stream; use it
//! directly to show partial transcripts while a long batch is still running.

use crate::config::ScanConfig;
use crate::output::RecognitionResult;
use crate::pipeline::encode::EncodedImage;
use crate::pipeline::pacing;
use crate::pipeline::recognize::{recognize_image, Recognizer};
use crate::progress::ProgressCallback;
use futures::stream;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;

/// A boxed stream of per-image results.
pub type RecognitionStream = Pin<Box<dyn Stream<Item = RecognitionResult> + Send>>;

/// Recognise `images` sequentially, yielding one result per image.
///
/// The stream never yields an error: failed images produce a result whose
/// text is the failure marker. Dropping the stream stops further dispatches.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdfscan::pipeline::{encode, extract, select};
/// use edgequake_pdfscan::{recognize_stream, HttpRecognizer, ScanConfig};
/// use futures::StreamExt;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let raw = std::fs::read("slides.pdf")?;
/// let config = ScanConfig::default();
/// let batch = extract::extract_images(&raw);
/// let selected = select::select_batch(&batch.images, config.min_image_bytes, config.max_images);
/// let recognizer = Arc::new(HttpRecognizer::from_config(&config, "api-key")?);
///
/// let mut results = recognize_stream(encode::encode_batch(&selected), recognizer, &config);
/// while let Some(r) = results.next().await {
///     println!("{}: {}", r.position, r.text);
/// }
/// # Ok(())
/// # }
/// ```
pub fn recognize_stream(
    images: Vec<EncodedImage>,
    recognizer: Arc<dyn Recognizer>,
    config: &ScanConfig,
) -> RecognitionStream {
    let total = images.len();
    let template = config.prompt_template().to_string();
    let timeout = config.api_timeout();
    let callback = config.progress_callback.clone();
    let policy = pacing::policy_for(config.dispatch_interval());

    let s = stream::unfold(
        (images.into_iter(), policy),
        move |(mut pending, mut policy)| {
            let recognizer = Arc::clone(&recognizer);
            let template = template.clone();
            let callback = callback.clone();
            async move {
                let image = pending.next()?;
                let position = image.position;

                policy.ready().await;
                if let Some(ref cb) = callback {
                    cb.on_image_start(position, total);
                }

                let result =
                    recognize_image(recognizer.as_ref(), image, total, &template, timeout).await;
                policy.record_completion();

                report(callback.as_ref(), &result);
                Some((result, (pending, policy)))
            }
        },
    );

    Box::pin(s)
}

fn report(callback: Option<&ProgressCallback>, result: &RecognitionResult) {
    let Some(cb) = callback else {
        return;
    };
    match &result.error {
        None => cb.on_image_complete(result.position, result.total, result.text.len()),
        Some(e) => cb.on_image_error(result.position, result.total, &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecognitionError;
    use crate::pipeline::encode::ImagePayload;
    use crate::pipeline::extract::ImageFormat;
    use crate::pipeline::recognize::RecognitionRequest;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Records dispatch and completion instants; fails on chosen positions.
    struct Recording {
        fail_on: Vec<usize>,
        call_time: Duration,
        log: Mutex<Vec<(usize, Instant, Instant)>>,
    }

    #[async_trait]
    impl Recognizer for Recording {
        async fn recognize(&self, req: &RecognitionRequest) -> Result<String, RecognitionError> {
            let started = Instant::now();
            tokio::time::sleep(self.call_time).await;
            self.log
                .lock()
                .unwrap()
                .push((req.position, started, Instant::now()));
            if self.fail_on.contains(&req.position) {
                Err(RecognitionError::Http {
                    status: 503,
                    body: "busy".into(),
                })
            } else {
                Ok(format!("text {}", req.position))
            }
        }
    }

    fn images(n: usize) -> Vec<EncodedImage> {
        (1..=n)
            .map(|i| EncodedImage {
                position: i,
                original_index: i * 2,
                format: ImageFormat::Jpeg,
                byte_len: 12_000,
                payload: ImagePayload {
                    data: "AAAA".into(),
                    mime_type: "image/jpeg",
                },
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn results_are_in_order_and_spaced() {
        let rec = Arc::new(Recording {
            fail_on: vec![],
            call_time: Duration::from_millis(100),
            log: Mutex::new(Vec::new()),
        });
        let config = ScanConfig::builder().dispatch_interval_ms(500).build().unwrap();

        let results: Vec<_> = recognize_stream(images(3), rec.clone(), &config)
            .collect()
            .await;

        let positions: Vec<_> = results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);

        let log = rec.log.lock().unwrap();
        for pair in log.windows(2) {
            let (_, _, prev_done) = pair[0];
            let (_, next_start, _) = pair[1];
            assert!(next_start >= prev_done + Duration::from_millis(500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_does_not_stop_the_batch() {
        let rec = Arc::new(Recording {
            fail_on: vec![2],
            call_time: Duration::from_millis(10),
            log: Mutex::new(Vec::new()),
        });
        let config = ScanConfig::builder().dispatch_interval_ms(0).build().unwrap();

        let results: Vec<_> = recognize_stream(images(3), rec, &config).collect().await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert!(results[1].text.starts_with("[识别失败: HTTP 503"));
        assert_eq!(results[2].text, "text 3");
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_call_is_bounded_by_the_timeout() {
        let rec = Arc::new(Recording {
            fail_on: vec![],
            call_time: Duration::from_secs(600),
            log: Mutex::new(Vec::new()),
        });
        let config = ScanConfig::builder()
            .api_timeout_secs(60)
            .dispatch_interval_ms(0)
            .build()
            .unwrap();

        let started = Instant::now();
        let results: Vec<_> = recognize_stream(images(1), rec, &config).collect().await;
        assert_eq!(results[0].error, Some(RecognitionError::Timeout { secs: 60 }));
        assert!(Instant::now() - started < Duration::from_secs(61));
    }
}
