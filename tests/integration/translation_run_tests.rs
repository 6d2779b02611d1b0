/*!
 * Integration tests for complete translation runs over scripted providers
 */

use legenda::app_config::Config;
use legenda::errors::{FailureKind, ProviderError, RunError, TranslationError};
use legenda::providers::mock::MockProvider;
use legenda::subtitle_processor::SubtitleCollection;
use legenda::translation::{EventSink, ProgressKind, RunEvent};
use crate::common;

/// The reference scenario: one group, the model answers every segment
#[tokio::test]
async fn test_run_withCompleteAnswer_shouldRenderRenumberedDocument() {
    common::init_logging();
    let provider = MockProvider::working().with_custom_response(|_| "Olá.|-Oi!\n-Tchau.|Obrigado.".to_string());
    let service = common::service(&provider);
    let mut segments = SubtitleCollection::parse_srt_string(common::SAMPLE_SRT).unwrap();
    segments[0].id = 11;
    let (sink, mut receiver) = EventSink::channel();

    let output = service.translate_segments(&segments, common::API_KEY, None, &sink).await.unwrap();

    assert_eq!(
        output.document,
        "1\n00:00:01,000 --> 00:00:02,500\nOlá.\n\n\
         2\n00:00:03,000 --> 00:00:04,000\n-Oi!\n-Tchau.\n\n\
         3\n00:00:05,000 --> 00:00:06,200\nObrigado."
    );
    assert_eq!(provider.request_count(), 1);

    let events = common::drain(&mut receiver);
    let results: Vec<&RunEvent> = events.iter().filter(|e| e.is_result()).collect();
    assert_eq!(results.len(), 1);
    assert_eq!(
        *results[0],
        RunEvent::Result {
            document: output.document.clone(),
            translations: output.translations.clone(),
        }
    );
}

/// Small ceilings give many groups; progress counts grow to the total
#[tokio::test]
async fn test_run_withManyGroups_shouldKeepAlignmentAndOrder() {
    let provider = MockProvider::working();
    let mut config = Config::default();
    config.translation.max_tokens_per_group = 40;
    let service = common::service_with(&provider, config);
    let segments = common::numbered_segments(25);
    let (sink, mut receiver) = EventSink::channel();

    let output = service.translate_segments(&segments, common::API_KEY, None, &sink).await.unwrap();

    assert_eq!(output.translations.len(), 25);
    for (i, text) in output.translations.iter().enumerate() {
        assert_eq!(text, &format!("[TRANSLATED] Line number {}", i + 1));
    }

    let events = common::drain(&mut receiver);
    let progress: Vec<_> = common::progress_events(&events)
        .into_iter()
        .filter(|e| e.kind == ProgressKind::Progress)
        .collect();
    assert!(progress.len() > 1);
    assert!(progress.windows(2).all(|w| w[0].translated_count < w[1].translated_count));
    assert_eq!(progress.last().unwrap().translated_count, 25);
    assert!(progress.iter().all(|e| e.chunk_total == Some(progress.len())));
    assert_eq!(common::count_kind(&events, ProgressKind::Complete), 1);
}

/// A model that always fails leaves every segment in its source language
#[tokio::test(start_paused = true)]
async fn test_run_withAlwaysTransientFailure_shouldCompleteWithSourceText() {
    let provider = MockProvider::failing();
    let mut config = Config::default();
    config.translation.max_tokens_per_group = 30;
    let service = common::service_with(&provider, config);
    let segments = common::numbered_segments(6);
    let (sink, mut receiver) = EventSink::channel();

    let output = service.translate_segments(&segments, common::API_KEY, None, &sink).await.unwrap();

    let sources: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
    assert_eq!(output.translations, sources);

    let events = common::drain(&mut receiver);
    assert_eq!(common::count_kind(&events, ProgressKind::Error), 0);
    assert_eq!(common::count_kind(&events, ProgressKind::Complete), 1);
    assert!(events.last().unwrap().is_result());
}

/// A key failing the length check never reaches the provider
#[tokio::test]
async fn test_run_withShortKey_shouldAbortAfterOneAttempt() {
    let provider = MockProvider::working();
    let service = common::service(&provider);
    let segments = common::numbered_segments(3);
    let (sink, mut receiver) = EventSink::channel();

    let result = service.translate_segments(&segments, "abc", None, &sink).await;

    assert!(matches!(result, Err(RunError::Translation(TranslationError::Auth { .. }))));
    assert_eq!(service.calls(), 1);
    assert_eq!(provider.request_count(), 0);

    let events = common::drain(&mut receiver);
    assert_eq!(events.len(), 1);
    let error = events[0].progress().unwrap();
    assert_eq!(error.kind, ProgressKind::Error);
    assert_eq!(error.error_kind, Some(FailureKind::Auth));
}

/// A rejected key is not retried and ends the run without a result
#[tokio::test]
async fn test_run_withRejectedKey_shouldNotRetry() {
    let provider = MockProvider::rejecting();
    let service = common::service(&provider);
    let segments = common::numbered_segments(4);
    let (sink, mut receiver) = EventSink::channel();

    let result = service.translate_segments(&segments, common::API_KEY, None, &sink).await;

    assert!(matches!(result, Err(RunError::Translation(TranslationError::Auth { .. }))));
    assert_eq!(service.calls(), 1);
    assert_eq!(provider.request_count(), 1);
    assert!(!common::drain(&mut receiver).iter().any(RunEvent::is_result));
}

/// A group of eight that only ever comes back with one segment is halved three times
#[tokio::test]
async fn test_run_withPersistentTruncation_shouldConvergeInThreeLevels() {
    let provider = MockProvider::truncating(1);
    let service = common::service(&provider);
    let segments = common::numbered_segments(8);

    let output = service
        .translate_segments(&segments, common::API_KEY, None, &EventSink::discard())
        .await
        .unwrap();

    let expected: Vec<String> = (1..=8).map(|i| format!("[TRANSLATED] Line number {}", i)).collect();
    assert_eq!(output.translations, expected);

    let sizes = provider.request_sizes();
    let level_sizes = [8, 4, 2, 1];
    for (level, size) in level_sizes.iter().enumerate() {
        let count = sizes.iter().filter(|s| *s == size).count();
        assert_eq!(count, 1 << level, "requests of {} segments", size);
    }
    assert_eq!(sizes.len(), 15);
}

/// Pipes in the source survive the delimiter
#[tokio::test]
async fn test_run_withPipeInSource_shouldNotShiftSegments() {
    let provider = MockProvider::working();
    let service = common::service(&provider);
    let segments = common::segments(&["Left | right", "Next"]);

    let output = service
        .translate_segments(&segments, common::API_KEY, None, &EventSink::discard())
        .await
        .unwrap();

    assert_eq!(output.translations, vec!["[TRANSLATED] Left | right", "[TRANSLATED] Next"]);
    assert_eq!(provider.request_sizes(), vec![2]);
}

/// The filename context reaches the instruction of every request
#[tokio::test]
async fn test_spawnTranslation_withFilename_shouldPassContext() {
    let provider = MockProvider::working();
    let service = common::service(&provider);

    let mut handle = service
        .spawn_translation(common::SAMPLE_SRT, common::API_KEY, Some(std::path::Path::new("/tv/Dark.S01E01.srt")))
        .unwrap();
    let mut events = Vec::new();
    while let Some(event) = handle.events.recv().await {
        events.push(event);
    }
    handle.task.await.unwrap().unwrap();

    assert!(events.last().unwrap().is_result());
    for request in provider.requests() {
        assert!(request.system.unwrap().contains("Dark S01E01"));
    }
}

/// Unreadable responses are transient, whatever numbers their messages carry
#[tokio::test(start_paused = true)]
async fn test_run_withUnparsableResponses_shouldCompleteWithSourceText() {
    let unparsable = || -> Result<String, ProviderError> {
        Err(ProviderError::ParseError("expected value at line 1 column 403".to_string()))
    };
    let provider = MockProvider::working().with_script([unparsable(), unparsable(), unparsable()]);
    let service = common::service(&provider);
    let segments = common::segments(&["Hello.", "Bye."]);
    let (sink, mut receiver) = EventSink::channel();

    let output = service.translate_segments(&segments, common::API_KEY, None, &sink).await.unwrap();

    assert_eq!(output.translations, vec!["Hello.", "Bye."]);
    assert_eq!(provider.request_count(), 3);

    let events = common::drain(&mut receiver);
    assert_eq!(common::count_kind(&events, ProgressKind::Error), 0);
    assert_eq!(common::count_kind(&events, ProgressKind::Complete), 1);
    assert!(events.last().unwrap().is_result());
}
