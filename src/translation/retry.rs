/*!
 * Bounded retries around the translation client.
 *
 * - Authentication failures and truncated responses are returned at once.
 * - Quota errors wait out the service cool-down before the next attempt.
 * - Transient errors back off exponentially (1s, 2s, 4s... by default).
 *
 * Repeated transient failures on short input are most often a rate limit
 * the service did not report as such, so after a few of them the controller
 * waits out the quota cool-down instead of the short backoff.
 */

use log::{debug, info, warn};
use std::time::Duration;

use crate::app_config::TranslationConfig;
use crate::errors::TranslationError;
use super::client::{TranslationClient, TranslationRequest};

/// Callback invoked before a quota cool-down starts, with its length
pub type QuotaWaitFn = Box<dyn Fn(Duration) + Send + Sync>;

/// Callback invoked when a quota cool-down is over
pub type QuotaResumeFn = Box<dyn Fn() + Send + Sync>;

/// Optional notifications around quota cool-downs
#[derive(Default)]
pub struct QuotaHooks {
    on_wait: Option<QuotaWaitFn>,
    on_resume: Option<QuotaResumeFn>,
}

impl QuotaHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_wait(mut self, callback: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.on_wait = Some(Box::new(callback));
        self
    }

    pub fn on_resume(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_resume = Some(Box::new(callback));
        self
    }

    fn notify_wait(&self, cooldown: Duration) {
        if let Some(callback) = &self.on_wait {
            callback(cooldown);
        }
    }

    fn notify_resume(&self) {
        if let Some(callback) = &self.on_resume {
            callback();
        }
    }
}

impl std::fmt::Debug for QuotaHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaHooks")
            .field("on_wait", &self.on_wait.is_some())
            .field("on_resume", &self.on_resume.is_some())
            .finish()
    }
}

/// Retry settings, taken from the translation config
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts for a regular batch
    pub max_attempts: u32,

    /// Attempts for a lone segment left over after splitting
    pub single_segment_attempts: u32,

    /// First backoff delay, doubled on each attempt
    pub backoff_base: Duration,

    /// Wait after a quota error
    pub quota_cooldown: Duration,

    /// Inputs shorter than this many characters count as short text
    pub short_text_threshold: usize,

    /// Consecutive short-text failures that trigger the quota path
    pub short_text_failure_limit: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            single_segment_attempts: config.single_segment_attempts,
            backoff_base: config.backoff_base(),
            quota_cooldown: config.quota_cooldown(),
            short_text_threshold: config.short_text_threshold,
            short_text_failure_limit: config.short_text_failure_limit,
        }
    }

    /// Backoff before the attempt following `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TranslationConfig::default())
    }
}

/// Translation client wrapped with retry, backoff and quota handling
#[derive(Debug)]
pub struct RetryController {
    client: TranslationClient,
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(client: TranslationClient, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn client(&self) -> &TranslationClient {
        &self.client
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Translate a batch with up to `max_attempts` attempts.
    ///
    /// Only ever returns a successful translation or a classified error.
    /// A `Quota` error is returned when the last allowed attempt hit the
    /// quota; it is terminal for this call.
    pub async fn translate_with_retry(
        &self,
        request: &TranslationRequest<'_>,
        max_attempts: u32,
        hooks: &QuotaHooks,
    ) -> Result<String, TranslationError> {
        let max_attempts = max_attempts.max(1);
        let short_text = request.char_len() < self.policy.short_text_threshold;
        let mut short_failures = 0;

        for attempt in 0..max_attempts {
            let last = attempt + 1 == max_attempts;

            let error = match self.client.translate(request).await {
                Ok(translation) => return Ok(translation),
                Err(error) => error,
            };

            match error {
                TranslationError::Auth { .. } | TranslationError::Truncated { .. } => return Err(error),

                TranslationError::Quota { ref message, retry_after_secs } => {
                    if last {
                        warn!("Quota still exhausted after {} attempts: {}", max_attempts, message);
                        return Err(error);
                    }
                    short_failures = 0;
                    self.wait_for_quota(Duration::from_secs(retry_after_secs), hooks).await;
                }

                TranslationError::Transient(ref message) => {
                    if last {
                        warn!("Giving up after {} attempts: {}", max_attempts, message);
                        return Err(error);
                    }

                    if short_text {
                        short_failures += 1;
                    }
                    if short_text && short_failures >= self.policy.short_text_failure_limit {
                        warn!(
                            "{} consecutive failures on a {} character request, treating it as an unreported quota limit",
                            short_failures,
                            request.char_len()
                        );
                        short_failures = 0;
                        self.wait_for_quota(self.policy.quota_cooldown, hooks).await;
                        continue;
                    }

                    let delay = self.policy.backoff(attempt);
                    debug!(
                        "Attempt {}/{} failed ({}), retrying in {:?}",
                        attempt + 1,
                        max_attempts,
                        message,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        // The final iteration always returns
        Err(TranslationError::Transient("no attempts were made".to_string()))
    }

    async fn wait_for_quota(&self, cooldown: Duration, hooks: &QuotaHooks) {
        warn!("Quota exhausted, waiting {}s before retrying", cooldown.as_secs());
        hooks.notify_wait(cooldown);
        tokio::time::sleep(cooldown).await;
        info!("Resuming after quota cool-down");
        hooks.notify_resume();
    }
}
