/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds, one translation per segment
 * - `MockProvider::failing()` - Always fails with a server error
 * - `MockProvider::rejecting()` - Always rejects the credential
 * - `MockProvider::rate_limited()` - Always reports quota exhaustion
 * - `MockProvider::truncating(n)` - Drops segments whenever more than `n` are sent
 *
 * A script of canned results can be queued in front of any behavior.
 */

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, Provider};
use crate::subtitle_processor::SEGMENT_DELIMITER;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with one translation per segment
    Working,
    /// Always fails with a server error
    Failing,
    /// Always rejects the credential
    Rejecting,
    /// Always reports rate limiting
    RateLimited,
    /// Answers with the first segment only when more than `max_segments` are sent
    Truncating { max_segments: usize },
    /// Fails every Nth request with a server error
    Intermittent { fail_every: usize },
    /// Returns an empty text
    Empty,
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Canned results served before the behavior applies
    script: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&str) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that rejects every credential
    pub fn rejecting() -> Self {
        Self::new(MockBehavior::Rejecting)
    }

    /// Create a mock that always reports quota exhaustion
    pub fn rate_limited() -> Self {
        Self::new(MockBehavior::RateLimited)
    }

    /// Create a mock that truncates batches larger than `max_segments`
    pub fn truncating(max_segments: usize) -> Self {
        Self::new(MockBehavior::Truncating { max_segments })
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Set a custom generator applied to the whole payload
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Queue canned results served before the behavior applies
    pub fn with_script(self, steps: impl IntoIterator<Item = Result<String, ProviderError>>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.extend(steps);
        }
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of delimited segments in each request, in order
    pub fn request_sizes(&self) -> Vec<usize> {
        self.requests()
            .iter()
            .map(|r| r.prompt.split(SEGMENT_DELIMITER).count())
            .collect()
    }

    /// Default translation: every segment tagged, delimiter preserved
    pub fn translate_payload(payload: &str) -> String {
        payload
            .split(SEGMENT_DELIMITER)
            .map(|segment| format!("[TRANSLATED] {}", segment))
            .collect::<Vec<_>>()
            .join(&SEGMENT_DELIMITER.to_string())
    }

    fn working_response(&self, payload: &str) -> String {
        match self.custom_response {
            Some(generator) => generator(payload),
            None => Self::translate_payload(payload),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
            script: Arc::clone(&self.script),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let scripted = self.script.lock().ok().and_then(|mut script| script.pop_front());
        if let Some(step) = scripted {
            return step;
        }

        let payload = request.prompt.as_str();
        match self.behavior {
            MockBehavior::Working => Ok(self.working_response(payload)),

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Rejecting => Err(ProviderError::AuthenticationError(
                "API key not valid. Please pass a valid API key.".to_string(),
            )),

            MockBehavior::RateLimited => Err(ProviderError::RateLimitExceeded(
                "Resource has been exhausted (e.g. check quota).".to_string(),
            )),

            MockBehavior::Truncating { max_segments } => {
                let segments: Vec<&str> = payload.split(SEGMENT_DELIMITER).collect();
                if segments.len() > max_segments {
                    Ok(self.working_response(segments[0]))
                } else {
                    Ok(self.working_response(payload))
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.working_response(payload))
                }
            }

            MockBehavior::Empty => Ok(String::new()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.working_response(payload))
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
