//! Sequential multi-candidate model gateway.
//!
//! Candidates are tried strictly in priority order. A rate-limited candidate
//! gets one retry after a fixed backoff; any other failure moves straight on.
//! Candidates are never called concurrently so quota is not spent speculatively.

use async_trait::async_trait;
use postline_abstraction::{Model, ModelParameters};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Suspends the current task; injectable so tests can skip real waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Text produced by one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelResponse {
    /// The generated text.
    pub text: String,
    /// ID of the candidate that answered.
    pub candidate: String,
}

/// Calls an ordered list of candidate models until one answers.
pub struct ModelGateway {
    candidates: Vec<Arc<dyn Model>>,
    parameters: ModelParameters,
    backoff: Duration,
    deadline: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl ModelGateway {
    /// Creates a gateway over `candidates` with the given backoff and deadline.
    pub fn new(candidates: Vec<Arc<dyn Model>>, backoff: Duration, deadline: Duration) -> Self {
        Self {
            candidates,
            parameters: ModelParameters::default(),
            backoff,
            deadline,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the sleeper used for the rate-limit backoff.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Sets the generation parameters sent with every call.
    #[must_use]
    pub fn with_parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Candidate IDs in priority order.
    pub fn candidate_ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|m| m.model_id()).collect()
    }

    /// Generates text for `prompt`, or `None` once every candidate is exhausted
    /// or the deadline passes.
    pub async fn generate(&self, prompt: &str) -> Option<RawModelResponse> {
        if prompt.trim().is_empty() || self.candidates.is_empty() {
            warn!(candidates = self.candidates.len(), "Nothing to generate: empty prompt or no candidates");
            return None;
        }

        match tokio::time::timeout(self.deadline, self.try_candidates(prompt)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(deadline_secs = self.deadline.as_secs(), "Generation deadline exceeded");
                None
            }
        }
    }

    async fn try_candidates(&self, prompt: &str) -> Option<RawModelResponse> {
        for model in &self.candidates {
            let candidate = model.model_id();
            info!(candidate = %candidate, "Calling model");

            let mut retried = false;
            loop {
                match model.generate_text(prompt, Some(self.parameters.clone())).await {
                    Ok(response) => {
                        debug!(candidate = %candidate, chars = response.content.len(), "Model answered");
                        return Some(RawModelResponse {
                            text: response.content,
                            candidate: candidate.to_string(),
                        });
                    }
                    Err(e) if e.is_rate_limited() && !retried => {
                        warn!(
                            candidate = %candidate,
                            backoff_secs = self.backoff.as_secs(),
                            error = %e,
                            "Rate limited, retrying once after backoff"
                        );
                        self.sleeper.sleep(self.backoff).await;
                        retried = true;
                    }
                    Err(e) => {
                        warn!(candidate = %candidate, error = %e, "Candidate failed, moving on");
                        break;
                    }
                }
            }
        }

        warn!(candidates = self.candidates.len(), "All model candidates exhausted");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postline_abstraction::ModelError;
    use postline_models::MockModel;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn quota() -> ModelError {
        ModelError::quota("gemini", "429 Too Many Requests")
    }

    fn gateway(models: Vec<Arc<MockModel>>, sleeper: Arc<RecordingSleeper>) -> ModelGateway {
        let candidates = models.into_iter().map(|m| m as Arc<dyn Model>).collect();
        ModelGateway::new(candidates, Duration::from_secs(10), Duration::from_secs(60))
            .with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let first = Arc::new(MockModel::always("a", "{}"));
        let second = Arc::new(MockModel::always("b", "{}"));
        let sleeper = Arc::new(RecordingSleeper::default());

        let response = gateway(vec![first.clone(), second.clone()], sleeper.clone())
            .generate("prompt")
            .await
            .unwrap();

        assert_eq!(response.candidate, "a");
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_retries_same_candidate_once() {
        let first = Arc::new(MockModel::scripted("a", vec![Err(quota()), Ok("ok".to_string())]));
        let second = Arc::new(MockModel::always("b", "{}"));
        let sleeper = Arc::new(RecordingSleeper::default());

        let response = gateway(vec![first.clone(), second.clone()], sleeper.clone())
            .generate("prompt")
            .await
            .unwrap();

        assert_eq!(response.candidate, "a");
        assert_eq!(response.text, "ok");
        assert_eq!(first.calls(), 2);
        assert_eq!(second.calls(), 0);
        assert_eq!(*sleeper.slept.lock().unwrap(), vec![Duration::from_secs(10)]);
    }

    #[tokio::test]
    async fn test_rate_limit_twice_moves_on() {
        let first = Arc::new(MockModel::scripted("a", vec![Err(quota())]));
        let second = Arc::new(MockModel::always("b", "second"));
        let sleeper = Arc::new(RecordingSleeper::default());

        let response = gateway(vec![first.clone(), second.clone()], sleeper.clone())
            .generate("prompt")
            .await
            .unwrap();

        assert_eq!(response.candidate, "b");
        assert_eq!(first.calls(), 2);
        assert_eq!(sleeper.slept.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_other_error_moves_on_without_retry() {
        let first = Arc::new(MockModel::scripted(
            "a",
            vec![Err(ModelError::ModelResponseError("500".to_string()))],
        ));
        let second = Arc::new(MockModel::always("b", "second"));
        let sleeper = Arc::new(RecordingSleeper::default());

        let response = gateway(vec![first.clone(), second], sleeper.clone())
            .generate("prompt")
            .await
            .unwrap();

        assert_eq!(response.candidate, "b");
        assert_eq!(first.calls(), 1);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_rate_limited_returns_none() {
        let models: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|id| Arc::new(MockModel::scripted(id, vec![Err(quota())])))
            .collect();
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = gateway(models.clone(), sleeper.clone()).generate("prompt").await;

        assert!(result.is_none());
        assert!(models.iter().all(|m| m.calls() == 2));
        assert_eq!(sleeper.slept.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_inputs_make_no_calls() {
        let model = Arc::new(MockModel::always("a", "{}"));
        let sleeper = Arc::new(RecordingSleeper::default());

        assert!(gateway(vec![model.clone()], sleeper.clone()).generate("  ").await.is_none());
        assert!(gateway(vec![], sleeper).generate("prompt").await.is_none());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_counts_as_exhaustion() {
        let model = Arc::new(MockModel::scripted("a", vec![Err(quota())]));
        let gateway = ModelGateway::new(
            vec![model as Arc<dyn Model>],
            Duration::from_secs(30),
            Duration::from_secs(5),
        );

        assert!(gateway.generate("prompt").await.is_none());
    }
}
