//! Model abstraction layer for Postline.
//!
//! This crate defines the trait and types the generation pipeline uses to talk
//! to a text-generation backend, independent of any concrete provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents an error that can occur when interacting with a generation backend.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelError {
    /// An error occurred during the API request (e.g., network issues, timeouts).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The model returned an error or an unusable response.
    #[error("Model Response Error: {0}")]
    ModelResponseError(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// The model provider is not supported or not configured (e.g., missing API key).
    #[error("Unsupported Model Provider: {0}")]
    UnsupportedModelProvider(String),

    /// Provider quota exceeded or rate limit hit.
    #[error("Provider '{provider}' quota exceeded{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    QuotaExceeded {
        /// The provider name (e.g., "gemini").
        provider: String,
        /// Optional error message from the provider.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Other unexpected errors.
    #[error("Other Model Error: {0}")]
    Other(String),
}

impl ModelError {
    /// Returns true for the retryable class: rate limiting and quota exhaustion.
    ///
    /// Every other variant is treated as non-retryable by callers.
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Convenience constructor for a quota error.
    pub fn quota(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QuotaExceeded { provider: provider.into(), message: Some(message.into()) }
    }
}

/// Output format hint passed to providers that support constrained output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free-form text.
    Text,
    /// A single JSON document.
    Json,
}

/// Parameters for controlling the model's generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Sampling temperature, between 0 and 2.
    pub temperature: Option<f32>,

    /// Nucleus sampling probability mass.
    pub top_p: Option<f32>,

    /// The maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sequences where the API will stop generating further tokens.
    pub stop_sequences: Option<Vec<String>>,

    /// Requested output format.
    pub response_format: Option<ResponseFormat>,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: Some(0.3),
            top_p: None,
            max_tokens: None,
            stop_sequences: None,
            response_format: None,
        }
    }
}

/// The response from a text generation model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The generated content.
    pub content: String,

    /// Optional: The ID of the model used to generate the response.
    pub model_id: Option<String>,

    /// Optional: Usage statistics for the request.
    pub usage: Option<ModelUsage>,
}

/// Usage statistics for a model request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: u32,

    /// Number of tokens in the completion.
    pub completion_tokens: u32,

    /// Total number of tokens used.
    pub total_tokens: u32,
}

/// A trait for interacting with a text-generation backend.
///
/// All models must be `Send + Sync` so a candidate list can be shared.
#[async_trait]
pub trait Model: Send + Sync {
    /// Generates a text completion based on the given prompt.
    ///
    /// # Errors
    /// Returns a `ModelError` if generation fails. Rate limiting must be
    /// reported as [`ModelError::QuotaExceeded`] so callers can back off.
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError>;

    /// Returns the ID of the model.
    fn model_id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_error_is_rate_limited() {
        let err = ModelError::quota("gemini", "RESOURCE_EXHAUSTED");
        assert!(err.is_rate_limited());
        assert_eq!(err.to_string(), "Provider 'gemini' quota exceeded: RESOURCE_EXHAUSTED");
    }

    #[test]
    fn test_other_errors_are_not_rate_limited() {
        assert!(!ModelError::RequestError("timeout".to_string()).is_rate_limited());
        assert!(!ModelError::ModelResponseError("500".to_string()).is_rate_limited());
        assert!(!ModelError::Other("boom".to_string()).is_rate_limited());
    }

    #[test]
    fn test_quota_display_without_message() {
        let err = ModelError::QuotaExceeded { provider: "gemini".to_string(), message: None };
        assert_eq!(err.to_string(), "Provider 'gemini' quota exceeded");
    }

    #[test]
    fn test_default_parameters_use_low_temperature() {
        let params = ModelParameters::default();
        assert_eq!(params.temperature, Some(0.3));
        assert!(params.response_format.is_none());
    }
}
