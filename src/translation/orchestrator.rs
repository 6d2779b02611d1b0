/*!
 * Run orchestration for one subtitle document.
 *
 * The orchestrator batches the segments, resolves the groups one after the
 * other and streams progress on a single channel:
 * 1. `progress` after every group, with cumulative counts
 * 2. `quota_wait` / `quota_resume` around every quota cool-down
 * 3. `complete` followed by one `result` event on success
 * 4. `error` when the run is aborted, with no `result`
 */

use log::{error, info, warn};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::app_config::TargetLanguage;
use crate::errors::{FailureKind, RunError, TranslationError};
use crate::subtitle_processor::{Segment, SubtitleCollection};
use super::alignment::align;
use super::batch::Batcher;
use super::retry::{QuotaHooks, RetryController};
use super::splitter::ChunkSplitter;

/// Kind of a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    Progress,
    QuotaWait,
    QuotaResume,
    Complete,
    Error,
}

/// One progress notification of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// What happened
    pub kind: ProgressKind,

    /// Segments with a final text so far
    pub translated_count: usize,

    /// Segments in the document
    pub total_count: usize,

    /// 1-based index of the group being processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,

    /// Number of groups in the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_total: Option<usize>,

    /// Human readable description
    pub message: String,

    /// Seconds until the service accepts requests again
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,

    /// Failure classification on `error` events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

/// Position of a run, shared by every event it emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunProgress {
    translated_count: usize,
    total_count: usize,
    chunk_index: usize,
    chunk_total: usize,
}

impl ProgressEvent {
    fn at(kind: ProgressKind, progress: RunProgress, message: impl Into<String>) -> Self {
        Self {
            kind,
            translated_count: progress.translated_count,
            total_count: progress.total_count,
            chunk_index: (progress.chunk_total > 0).then_some(progress.chunk_index),
            chunk_total: (progress.chunk_total > 0).then_some(progress.chunk_total),
            message: message.into(),
            retry_after_seconds: None,
            error_kind: None,
        }
    }

    fn quota_wait(progress: RunProgress, cooldown: Duration) -> Self {
        let seconds = cooldown.as_secs();
        Self {
            retry_after_seconds: Some(seconds),
            ..Self::at(
                ProgressKind::QuotaWait,
                progress,
                format!("Quota exceeded, waiting {}s before retrying", seconds),
            )
        }
    }

    fn quota_resume(progress: RunProgress) -> Self {
        Self::at(ProgressKind::QuotaResume, progress, "Resuming translation")
    }

    fn failure(progress: RunProgress, error: &TranslationError) -> Self {
        let retry_after_seconds = match error {
            TranslationError::Quota { retry_after_secs, .. } => Some(*retry_after_secs),
            _ => None,
        };
        Self {
            retry_after_seconds,
            error_kind: Some(error.kind()),
            ..Self::at(ProgressKind::Error, progress, error.to_string())
        }
    }
}

/// Everything a run puts on its channel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Progress(ProgressEvent),
    Result {
        /// Rendered SubRip document
        document: String,
        /// One text per source segment
        translations: Vec<String>,
    },
}

impl RunEvent {
    /// The progress payload, if this is not the result
    pub fn progress(&self) -> Option<&ProgressEvent> {
        match self {
            Self::Progress(event) => Some(event),
            Self::Result { .. } => None,
        }
    }

    pub fn is_result(&self) -> bool {
        matches!(self, Self::Result { .. })
    }

    /// One JSON object, for line-delimited output
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Sending half of a run's event channel
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Option<UnboundedSender<RunEvent>>,
}

impl EventSink {
    /// New sink and the receiver the caller consumes
    pub fn channel() -> (Self, UnboundedReceiver<RunEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender: Some(sender) }, receiver)
    }

    /// Sink that drops every event
    pub fn discard() -> Self {
        Self { sender: None }
    }

    pub fn send(&self, event: RunEvent) {
        if let Some(sender) = &self.sender {
            // A closed channel is noticed by the orchestrator before the next group
            let _ = sender.send(event);
        }
    }

    fn progress(&self, event: ProgressEvent) {
        self.send(RunEvent::Progress(event));
    }

    /// True once the receiver has been dropped
    pub fn is_closed(&self) -> bool {
        self.sender.as_ref().is_some_and(UnboundedSender::is_closed)
    }
}

/// Final output of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Rendered SubRip document
    pub document: String,

    /// One text per source segment
    pub translations: Vec<String>,
}

/// Drives runs through batching, splitting and retries
#[derive(Debug)]
pub struct Orchestrator {
    batcher: Batcher,
    controller: RetryController,
    target_language: TargetLanguage,
}

impl Orchestrator {
    pub fn new(batcher: Batcher, controller: RetryController, target_language: TargetLanguage) -> Self {
        Self {
            batcher,
            controller,
            target_language,
        }
    }

    pub fn controller(&self) -> &RetryController {
        &self.controller
    }

    /// Translate a full segment sequence.
    ///
    /// Groups are resolved strictly in order. A quota error that escapes a
    /// group is waited out once and the group is retried; a second one, or an
    /// authentication failure, aborts the run.
    pub async fn run(
        &self,
        segments: &[Segment],
        api_key: &str,
        context: Option<&str>,
        sink: &EventSink,
    ) -> Result<RunOutput, RunError> {
        let groups = self.batcher.group(segments);
        let mut progress = RunProgress {
            translated_count: 0,
            total_count: segments.len(),
            chunk_index: 0,
            chunk_total: groups.len(),
        };
        let mut outputs: Vec<String> = Vec::with_capacity(segments.len());

        info!(
            "Translating {} segments in {} groups with {}",
            segments.len(),
            groups.len(),
            self.controller.client().provider_name()
        );

        for (idx, group) in groups.iter().enumerate() {
            if sink.is_closed() {
                warn!("Event receiver dropped, abandoning run before group {}", idx + 1);
                return Err(RunError::Abandoned);
            }
            progress.chunk_index = idx + 1;

            let hooks = Self::quota_hooks(sink, progress);
            let splitter = ChunkSplitter::new(&self.controller, self.target_language, api_key, context, &hooks);

            let result = match splitter.resolve(group.segments).await {
                Err(TranslationError::Quota { retry_after_secs, message }) => {
                    let cooldown = Duration::from_secs(retry_after_secs);
                    warn!(
                        "Group {}/{} ran out of quota ({}), pausing the run for {}s",
                        progress.chunk_index, progress.chunk_total, message, retry_after_secs
                    );
                    sink.progress(ProgressEvent::quota_wait(progress, cooldown));
                    tokio::time::sleep(cooldown).await;
                    sink.progress(ProgressEvent::quota_resume(progress));
                    splitter.resolve(group.segments).await
                }
                other => other,
            };

            match result {
                Ok(texts) => {
                    let texts = align(texts, group.segments);
                    progress.translated_count += texts.len();
                    outputs.extend(texts);
                    sink.progress(ProgressEvent::at(
                        ProgressKind::Progress,
                        progress,
                        format!(
                            "Translated {} of {} segments",
                            progress.translated_count, progress.total_count
                        ),
                    ));
                }
                Err(error) => {
                    error!(
                        "Aborting run at group {}/{}: {}",
                        progress.chunk_index, progress.chunk_total, error
                    );
                    sink.progress(ProgressEvent::failure(progress, &error));
                    return Err(error.into());
                }
            }
        }

        let translations = align(outputs, segments);
        progress.translated_count = translations.len();
        let document = SubtitleCollection::render_with_texts(segments, &translations);

        info!("Translation complete: {} segments", translations.len());
        sink.progress(ProgressEvent::at(ProgressKind::Complete, progress, "Translation complete"));
        sink.send(RunEvent::Result {
            document: document.clone(),
            translations: translations.clone(),
        });

        Ok(RunOutput { document, translations })
    }

    fn quota_hooks(sink: &EventSink, progress: RunProgress) -> QuotaHooks {
        let wait_sink = sink.clone();
        let resume_sink = sink.clone();
        QuotaHooks::new()
            .on_wait(move |cooldown| wait_sink.progress(ProgressEvent::quota_wait(progress, cooldown)))
            .on_resume(move || resume_sink.progress(ProgressEvent::quota_resume(progress)))
    }
}
