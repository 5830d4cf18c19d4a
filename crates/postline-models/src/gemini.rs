//! Google Gemini model implementation.
//!
//! This module provides an implementation of the `Model` trait for Google's
//! Gemini `generateContent` REST endpoint, plus model discovery.

use async_trait::async_trait;
use postline_abstraction::{Model, ModelError, ModelParameters, ModelResponse, ModelUsage, ResponseFormat};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default public endpoint for the Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "gemini";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Harm categories that can be relaxed per request.
const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Google Gemini model implementation.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    /// The model ID (e.g., "gemini-flash-latest").
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the Gemini API.
    base_url: String,
    /// Send `BLOCK_NONE` for every harm category.
    relax_safety: bool,
    /// HTTP client for making requests.
    client: Client,
}

impl GeminiModel {
    /// Creates a new `GeminiModel`, reading the key from `GEMINI_API_KEY`.
    ///
    /// # Errors
    /// Returns a `ModelError` if the API key is not found in environment variables.
    #[allow(clippy::disallowed_methods)] // env::var is needed for API key loading
    pub fn new(model_id: String) -> Result<Self, ModelError> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| {
            ModelError::UnsupportedModelProvider(
                "GEMINI_API_KEY environment variable not set".to_string(),
            )
        })?;

        Ok(Self::with_api_key(model_id, api_key))
    }

    /// Creates a new `GeminiModel` with a custom API key.
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self {
            model_id,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            relax_safety: false,
            client: build_client(DEFAULT_TIMEOUT),
        }
    }

    /// Points the model at a different endpoint (proxies, test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    /// Sends `BLOCK_NONE` for all harm categories when enabled.
    #[must_use]
    pub const fn with_relaxed_safety(mut self, relax: bool) -> Self {
        self.relax_safety = relax;
        self
    }

    /// Lists the model names available to `api_key` that support `generateContent`.
    ///
    /// # Errors
    /// Returns a `ModelError` on network failure or an error status.
    pub async fn list_models(base_url: &str, api_key: &str) -> Result<Vec<String>, ModelError> {
        let client = build_client(DEFAULT_TIMEOUT);
        let base_url = base_url.trim_end_matches('/');
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = client.get(format!("{base_url}/models")).query(&[("key", api_key)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(|e| {
                error!(error = %e, "Failed to list Gemini models");
                ModelError::RequestError(format!("Network error: {}", e))
            })?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
                return Err(map_error_status(status, error_text));
            }

            let page: GeminiModelList = response.json().await.map_err(|e| {
                ModelError::SerializationError(format!("Failed to parse model list: {}", e))
            })?;

            names.extend(
                page.models
                    .into_iter()
                    .filter(|m| m.supported_generation_methods.iter().any(|g| g == "generateContent"))
                    .map(|m| m.name),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(names)
    }

    fn safety_settings(&self) -> Option<Vec<GeminiSafetySetting>> {
        self.relax_safety.then(|| {
            HARM_CATEGORIES
                .iter()
                .map(|category| GeminiSafetySetting {
                    category: (*category).to_string(),
                    threshold: "BLOCK_NONE".to_string(),
                })
                .collect()
        })
    }

    fn build_request(&self, prompt: &str, parameters: Option<&ModelParameters>) -> GeminiRequest {
        let generation_config = parameters.map(|params| {
            let temperature = params.temperature.map(|t| {
                let clamped = t.clamp(0.0, 2.0);
                if (clamped - t).abs() > f32::EPSILON {
                    warn!(original = t, clamped, "Clamping temperature to Gemini range [0.0, 2.0]");
                }
                clamped
            });

            GeminiGenerationConfig {
                temperature,
                top_p: params.top_p,
                max_output_tokens: params.max_tokens,
                stop_sequences: params.stop_sequences.clone(),
                response_mime_type: match params.response_format {
                    Some(ResponseFormat::Json) => Some("application/json".to_string()),
                    _ => None,
                },
            }
        });

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: Some(prompt.to_string()) }],
            }],
            generation_config,
            safety_settings: self.safety_settings(),
        }
    }
}

#[async_trait]
impl Model for GeminiModel {
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = prompt.len(),
            parameters = ?parameters,
            "GeminiModel generating text"
        );

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model_id);
        let request_body = self.build_request(prompt, parameters.as_ref());

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to Gemini API");
                ModelError::RequestError(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                model_id = %self.model_id,
                status = %status,
                error = %error_text,
                "Gemini API returned error status"
            );
            return Err(map_error_status(status, error_text));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Gemini API response");
            ModelError::SerializationError(format!("Failed to parse response: {}", e))
        })?;

        let candidate = gemini_response.candidates.first().ok_or_else(|| {
            error!("No candidates in Gemini API response");
            ModelError::ModelResponseError("No content in API response".to_string())
        })?;

        let content: String = candidate
            .content
            .as_ref()
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default();

        if content.is_empty() {
            error!(finish_reason = ?candidate.finish_reason, "Empty candidate in Gemini API response");
            return Err(ModelError::ModelResponseError(format!(
                "Empty response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        let usage = gemini_response.usage_metadata.map(|meta| ModelUsage {
            prompt_tokens: meta.prompt_token_count.unwrap_or(0),
            completion_tokens: meta.candidates_token_count.unwrap_or(0),
            total_tokens: meta.total_token_count.unwrap_or(0),
        });

        Ok(ModelResponse { content, model_id: Some(self.model_id.clone()), usage })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to default HTTP client");
        Client::new()
    })
}

/// Maps a non-success status to the model error taxonomy.
///
/// 402 and 429 are always quota errors; a `RESOURCE_EXHAUSTED` or quota body
/// is treated the same way whatever the status.
fn map_error_status(status: StatusCode, error_text: String) -> ModelError {
    let upper = error_text.to_uppercase();
    let lower = error_text.to_lowercase();
    let is_quota_error = upper.contains("RESOURCE_EXHAUSTED")
        || lower.contains("quota exceeded")
        || lower.contains("rate limit");

    if status == StatusCode::PAYMENT_REQUIRED || status == StatusCode::TOO_MANY_REQUESTS || is_quota_error {
        return ModelError::QuotaExceeded { provider: PROVIDER.to_string(), message: Some(error_text) };
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ModelError::UnsupportedModelProvider(format!(
            "Authentication failed ({}): {}",
            status, error_text
        ));
    }

    if status.is_server_error() {
        return ModelError::ModelResponseError(format!("Server error ({}): {}", status, error_text));
    }

    ModelError::ModelResponseError(format!("API error ({}): {}", status, error_text))
}

// Gemini API request/response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    safety_settings: Option<Vec<GeminiSafetySetting>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct GeminiSafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)] // Matches API naming
struct GeminiUsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u32>,
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiModelList {
    #[serde(default)]
    models: Vec<GeminiModelInfo>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiModelInfo {
    name: String,
    #[serde(rename = "supportedGenerationMethods", default)]
    supported_generation_methods: Vec<String>,
}
