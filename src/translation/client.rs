/*!
 * Translation client: one request, one classified outcome.
 *
 * The client sends a delimiter-joined batch with the fixed subtitle
 * instruction and maps whatever comes back onto `TranslationError`.
 * It keeps no state between calls apart from a call counter.
 */

use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::app_config::{TargetLanguage, TranslationConfig};
use crate::errors::{FailureKind, ProviderError, TranslationError};
use crate::providers::{CompletionRequest, Provider};
use crate::subtitle_processor::{split_texts, SEGMENT_DELIMITER};
use super::prompts::PromptTemplate;

/// Phrases the service uses when it rejects a credential
const AUTH_MARKERS: &[&str] = &[
    "unauthorized",
    "unauthenticated",
    "forbidden",
    "permission_denied",
    "permission denied",
    "invalid key",
    "invalid api key",
    "api key not valid",
    "api_key_invalid",
    "api key expired",
    "missing api key",
    "api key is required",
    "method doesn't allow unregistered callers",
    "caller not authorized",
];

/// Phrases the service uses for rate limiting and exhausted quota
const QUOTA_MARKERS: &[&str] = &[
    "resource_exhausted",
    "resource has been exhausted",
    "quota exceeded",
    "exceeded your current quota",
    "rate limit",
    "too many requests",
];

/// One batch to translate
#[derive(Debug, Clone, Copy)]
pub struct TranslationRequest<'a> {
    /// Segment texts joined with the delimiter
    pub text: &'a str,

    /// Language to translate into
    pub target_language: TargetLanguage,

    /// Credential for the service
    pub api_key: &'a str,

    /// Optional context appended to the instruction
    pub context: Option<&'a str>,
}

impl<'a> TranslationRequest<'a> {
    pub fn new(text: &'a str, target_language: TargetLanguage, api_key: &'a str) -> Self {
        Self {
            text,
            target_language,
            api_key,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Option<&'a str>) -> Self {
        self.context = context;
        self
    }

    /// Number of segments in the batch
    pub fn segment_count(&self) -> usize {
        self.text.split(SEGMENT_DELIMITER).count()
    }

    /// Character length used by the short-text heuristic
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Single-call translation client
#[derive(Debug)]
pub struct TranslationClient {
    /// Remote text generation capability
    provider: Arc<dyn Provider>,

    /// Instruction template
    template: PromptTemplate,

    /// Keys shorter than this never reach the provider
    min_api_key_length: usize,

    /// Cool-down carried by quota errors
    quota_cooldown_secs: u64,

    /// Number of translate calls, including locally rejected ones
    calls: AtomicUsize,
}

impl TranslationClient {
    pub fn new(provider: Arc<dyn Provider>, config: &TranslationConfig) -> Self {
        Self {
            provider,
            template: PromptTemplate::default(),
            min_api_key_length: config.min_api_key_length,
            quota_cooldown_secs: config.quota_cooldown_secs,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of translate calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Check the credential shape without contacting the service
    pub fn check_api_key(&self, api_key: &str) -> Result<(), TranslationError> {
        if api_key.trim().chars().count() < self.min_api_key_length {
            return Err(TranslationError::Auth {
                message: format!(
                    "API key is too short to be valid (expected at least {} characters)",
                    self.min_api_key_length
                ),
            });
        }
        Ok(())
    }

    /// Translate one batch.
    ///
    /// Returns the raw delimiter-joined translation. A response with fewer
    /// segments than were sent, or with no text at all, is `Truncated`.
    pub async fn translate(&self, request: &TranslationRequest<'_>) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_api_key(request.api_key)?;

        let expected = request.segment_count();
        let completion = CompletionRequest::new(request.text, request.api_key.trim())
            .system(self.template.render(request.target_language, request.context));

        debug!(
            "Requesting {} segments ({} chars) from {}",
            expected,
            request.char_len(),
            self.provider.name()
        );

        let response = match self.provider.complete(completion).await {
            Ok(response) => response,
            Err(ProviderError::EmptyResponse) => {
                return Err(TranslationError::Truncated { expected, received: 0 });
            }
            Err(error) => return Err(self.classify(error)),
        };

        if response.trim().is_empty() {
            return Err(TranslationError::Truncated { expected, received: 0 });
        }

        let received = split_texts(&response).len();
        if received < expected {
            debug!("Response holds {} of {} segments", received, expected);
            return Err(TranslationError::Truncated { expected, received });
        }
        if received > expected {
            warn!("Response holds {} segments, {} were sent", received, expected);
        }

        Ok(response)
    }

    /// Map a raw provider failure onto the translation taxonomy.
    ///
    /// Status codes decide first. Phrase markers are only looked up in the
    /// message the service itself reported; transport and parse failures
    /// are always transient.
    pub fn classify(&self, error: ProviderError) -> TranslationError {
        let quota = |message: String| TranslationError::Quota {
            message,
            retry_after_secs: self.quota_cooldown_secs,
        };
        let auth = |message: &str| TranslationError::Auth {
            message: auth_message(message),
        };

        match error {
            ProviderError::AuthenticationError(message) => auth(message.as_str()),
            ProviderError::ApiError { status_code: 401 | 403, message } => auth(message.as_str()),
            ProviderError::RateLimitExceeded(message) => quota(message),
            ProviderError::ApiError { status_code: 429, message } => quota(message),
            ProviderError::ApiError { ref message, .. } | ProviderError::RequestFailed(ref message) => {
                match reported_failure(message) {
                    Some(FailureKind::Auth) => auth(message.as_str()),
                    Some(FailureKind::Quota) => quota(error.to_string()),
                    _ => TranslationError::Transient(error.to_string()),
                }
            }
            ProviderError::ParseError(_) | ProviderError::ConnectionError(_) | ProviderError::EmptyResponse => {
                TranslationError::Transient(error.to_string())
            }
        }
    }
}

/// Failure kind named by a service-reported message, if any
fn reported_failure(message: &str) -> Option<FailureKind> {
    let lower = message.to_lowercase();
    if AUTH_MARKERS.iter().any(|marker| lower.contains(marker)) {
        Some(FailureKind::Auth)
    } else if QUOTA_MARKERS.iter().any(|marker| lower.contains(marker)) {
        Some(FailureKind::Quota)
    } else {
        None
    }
}

/// User-facing explanation for a rejected credential
fn auth_message(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let hint = if lower.contains("unregistered callers") {
        "the service did not recognise the API key, check that it was copied completely"
    } else if lower.contains("invalid key") || lower.contains("invalid api key") || lower.contains("api key not valid") {
        "the API key is invalid, create one at https://aistudio.google.com/app/apikey"
    } else if lower.contains("missing api key") || lower.contains("api key is required") {
        "no API key was sent"
    } else {
        "the API key was rejected or is not authorized"
    };
    format!("{} ({})", hint, raw.trim())
}
