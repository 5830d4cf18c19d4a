//! Model implementations for Postline.
//!
//! This crate provides concrete implementations of the `Model` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Scripted responses for tests and dry runs
//! - **Gemini**: Google's Gemini models (API key required)

pub mod factory;
pub mod gemini;

use async_trait::async_trait;
use postline_abstraction::{Model, ModelError, ModelParameters, ModelResponse, ModelUsage};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

pub use factory::{ModelConfig, ModelFactory, ModelType};
pub use gemini::GeminiModel;

/// Canned record returned by an unscripted [`MockModel`].
pub const MOCK_RECORD_JSON: &str = r#"{"viral_title":"Mock report","category":"부동산 분석","search_keyword":"mock","roi_data":{"years":[2024,2025],"values":[100,110],"title":"Mock trend"},"calculator_type":"none","blog_body_markdown":"Mock body [[MID_IMAGE]]","tistory_teaser":"<p>mock</p>"}"#;

/// A scripted implementation of the `Model` trait.
///
/// Each call pops the next scripted outcome. Once the script is exhausted
/// the model keeps returning [`MOCK_RECORD_JSON`].
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    calls: AtomicUsize,
}

impl MockModel {
    /// Creates a new `MockModel` with the given ID and an empty script.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self { id, script: Mutex::new(VecDeque::new()), calls: AtomicUsize::new(0) }
    }

    /// Creates a `MockModel` that replays `outcomes` in order.
    #[must_use]
    pub fn scripted(id: impl Into<String>, outcomes: Vec<Result<String, ModelError>>) -> Self {
        Self { id: id.into(), script: Mutex::new(outcomes.into()), calls: AtomicUsize::new(0) }
    }

    /// Creates a `MockModel` that always answers with `text`.
    #[must_use]
    pub fn always(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::scripted(id, vec![Ok(text.into())])
    }

    /// Number of `generate_text` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> Result<String, ModelError> {
        let mut script = self
            .script
            .lock()
            .map_err(|e| ModelError::Other(format!("mock script poisoned: {e}")))?;
        match script.len() {
            0 => Ok(MOCK_RECORD_JSON.to_string()),
            // The last scripted outcome repeats.
            1 => script.front().cloned().unwrap_or_else(|| Ok(MOCK_RECORD_JSON.to_string())),
            _ => script.pop_front().unwrap_or_else(|| Ok(MOCK_RECORD_JSON.to_string())),
        }
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(
            model_id = %self.id,
            prompt_len = prompt.len(),
            parameters = ?parameters,
            "MockModel generating text"
        );

        let content = self.next_outcome()?;
        let prompt_tokens = count_tokens(prompt);
        let completion_tokens = count_tokens(&content);

        Ok(ModelResponse {
            content,
            model_id: Some(self.id.clone()),
            usage: Some(ModelUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
        })
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}

/// Count tokens in a string (simplified: word count).
#[allow(clippy::cast_possible_truncation)]
fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unscripted_mock_returns_canned_record() {
        let model = MockModel::new("mock".to_string());
        let response = model.generate_text("topic", None).await.unwrap();
        assert_eq!(response.content, MOCK_RECORD_JSON);
        assert_eq!(response.model_id.as_deref(), Some("mock"));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_scripted_mock_replays_in_order_and_repeats_last() {
        let model = MockModel::scripted(
            "m",
            vec![Err(ModelError::quota("mock", "429")), Ok("second".to_string())],
        );

        assert!(model.generate_text("p", None).await.unwrap_err().is_rate_limited());
        assert_eq!(model.generate_text("p", None).await.unwrap().content, "second");
        assert_eq!(model.generate_text("p", None).await.unwrap().content, "second");
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_usage_counts_words() {
        let model = MockModel::always("m", "one two three");
        let usage = model.generate_text("a b", None).await.unwrap().usage.unwrap();
        assert_eq!(usage.prompt_tokens, 2);
        assert_eq!(usage.completion_tokens, 3);
        assert_eq!(usage.total_tokens, 5);
    }
}
