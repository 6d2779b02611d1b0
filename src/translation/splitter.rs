/*!
 * Recursive splitting of groups whose responses come back truncated.
 *
 * `resolve` always yields exactly one text per segment of the group. A
 * truncated group is halved and both halves are resolved concurrently; a
 * lone segment that keeps coming back truncated, and any group that fails
 * for a transient reason, falls back to its source text. Only quota
 * exhaustion and authentication failures escape, because they concern the
 * whole run rather than this group. The first of them to surface in either
 * half is returned at once and the other half is dropped.
 */

use futures::future::{self, BoxFuture, FutureExt};
use log::{debug, warn};

use crate::app_config::TargetLanguage;
use crate::errors::TranslationError;
use crate::subtitle_processor::{join_texts, split_texts, Segment};
use super::alignment::{align, source_texts};
use super::client::TranslationRequest;
use super::retry::{QuotaHooks, RetryController};

/// Resolves groups for one run
pub struct ChunkSplitter<'a> {
    controller: &'a RetryController,
    target_language: TargetLanguage,
    api_key: &'a str,
    context: Option<&'a str>,
    hooks: &'a QuotaHooks,
}

impl<'a> ChunkSplitter<'a> {
    pub fn new(
        controller: &'a RetryController,
        target_language: TargetLanguage,
        api_key: &'a str,
        context: Option<&'a str>,
        hooks: &'a QuotaHooks,
    ) -> Self {
        Self {
            controller,
            target_language,
            api_key,
            context,
            hooks,
        }
    }

    /// Translate a group, one output per segment in the same order
    pub fn resolve<'s>(&'s self, segments: &'s [Segment]) -> BoxFuture<'s, Result<Vec<String>, TranslationError>> {
        async move {
            if segments.is_empty() {
                return Ok(Vec::new());
            }

            let text = join_texts(segments);
            let request = self.request(&text);
            let max_attempts = self.controller.policy().max_attempts;

            match self.controller.translate_with_retry(&request, max_attempts, self.hooks).await {
                Ok(response) => Ok(align(split_texts(&response), segments)),

                Err(TranslationError::Truncated { expected, received }) if segments.len() == 1 => {
                    debug!("Single segment {} truncated ({} of {})", segments[0].id, received, expected);
                    self.resolve_single(&segments[0]).await
                }

                Err(TranslationError::Truncated { expected, received }) => {
                    let mid = segments.len().div_ceil(2);
                    debug!(
                        "Group of {} truncated ({} received), splitting into {} + {}",
                        expected,
                        received,
                        mid,
                        segments.len() - mid
                    );
                    let (mut left, right) =
                        future::try_join(self.resolve(&segments[..mid]), self.resolve(&segments[mid..])).await?;
                    left.extend(right);
                    Ok(align(left, segments))
                }

                Err(error @ (TranslationError::Quota { .. } | TranslationError::Auth { .. })) => Err(error),

                Err(error) => {
                    warn!(
                        "Keeping source text for segments {}-{}: {}",
                        segments[0].id,
                        segments[segments.len() - 1].id,
                        error
                    );
                    Ok(source_texts(segments))
                }
            }
        }
        .boxed()
    }

    /// Retry a lone segment with the larger attempt budget
    async fn resolve_single(&self, segment: &Segment) -> Result<Vec<String>, TranslationError> {
        let sources = std::slice::from_ref(segment);
        let text = segment.request_text();
        let request = self.request(&text);
        let budget = self.controller.policy().single_segment_attempts;

        for attempt in 1..=budget {
            match self.controller.translate_with_retry(&request, budget, self.hooks).await {
                Ok(response) => return Ok(align(split_texts(&response), sources)),
                Err(TranslationError::Truncated { .. }) => {
                    debug!("Segment {} still truncated (attempt {}/{})", segment.id, attempt, budget);
                }
                Err(error @ (TranslationError::Quota { .. } | TranslationError::Auth { .. })) => return Err(error),
                Err(error) => {
                    warn!("Keeping source text for segment {}: {}", segment.id, error);
                    return Ok(source_texts(sources));
                }
            }
        }

        warn!("Segment {} never came back complete, keeping source text", segment.id);
        Ok(source_texts(sources))
    }

    fn request<'t>(&'t self, text: &'t str) -> TranslationRequest<'t> {
        TranslationRequest::new(text, self.target_language, self.api_key).with_context(self.context)
    }
}
