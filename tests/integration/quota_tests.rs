/*!
 * Quota cool-downs and abandoned runs
 */

use std::time::Duration;
use tokio::time::Instant;

use legenda::app_config::Config;
use legenda::errors::{FailureKind, ProviderError, RunError};
use legenda::providers::mock::{MockBehavior, MockProvider};
use legenda::translation::{EventSink, ProgressKind, RunEvent};
use crate::common;

#[tokio::test(start_paused = true)]
async fn test_run_withOneQuotaError_shouldWaitThenComplete() {
    common::init_logging();
    let provider = MockProvider::working()
        .with_script([Err(ProviderError::RateLimitExceeded("RESOURCE_EXHAUSTED".to_string()))]);
    let service = common::service(&provider);
    let segments = common::numbered_segments(3);
    let (sink, mut receiver) = EventSink::channel();
    let start = Instant::now();

    let output = service.translate_segments(&segments, common::API_KEY, None, &sink).await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(65));
    assert_eq!(output.translations.len(), 3);
    assert_eq!(provider.request_count(), 2);

    let events = common::drain(&mut receiver);
    let kinds: Vec<ProgressKind> = common::progress_events(&events).iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ProgressKind::QuotaWait,
            ProgressKind::QuotaResume,
            ProgressKind::Progress,
            ProgressKind::Complete
        ]
    );
    let wait = events[0].progress().unwrap();
    assert_eq!(wait.retry_after_seconds, Some(65));
    assert_eq!(wait.translated_count, 0);
    assert_eq!(events.iter().filter(|e| e.is_result()).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_withConfiguredCooldown_shouldReportIt() {
    let provider = MockProvider::working().with_script([Err(ProviderError::ApiError {
        status_code: 429,
        message: "Too Many Requests".to_string(),
    })]);
    let mut config = Config::default();
    config.translation.quota_cooldown_secs = 10;
    let service = common::service_with(&provider, config);
    let (sink, mut receiver) = EventSink::channel();
    let start = Instant::now();

    service
        .translate_segments(&common::numbered_segments(2), common::API_KEY, None, &sink)
        .await
        .unwrap();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(65));
    let events = common::drain(&mut receiver);
    let wait = common::progress_events(&events)
        .into_iter()
        .find(|e| e.kind == ProgressKind::QuotaWait)
        .unwrap();
    assert_eq!(wait.retry_after_seconds, Some(10));
}

#[tokio::test(start_paused = true)]
async fn test_run_withExhaustedQuota_shouldEndWithQuotaError() {
    let provider = MockProvider::rate_limited();
    let service = common::service(&provider);
    let (sink, mut receiver) = EventSink::channel();

    let result = service
        .translate_segments(&common::numbered_segments(2), common::API_KEY, None, &sink)
        .await;

    assert!(matches!(result, Err(RunError::Translation(ref e)) if e.is_quota()));

    let events = common::drain(&mut receiver);
    assert!(!events.iter().any(RunEvent::is_result));
    let last = events.last().unwrap().progress().unwrap();
    assert_eq!(last.kind, ProgressKind::Error);
    assert_eq!(last.error_kind, Some(FailureKind::Quota));
    assert_eq!(last.retry_after_seconds, Some(65));
}

#[tokio::test]
async fn test_spawnTranslation_withReceiverDropped_shouldAbandonBeforeFirstGroup() {
    let provider = MockProvider::working();
    let service = common::service(&provider);

    let handle = service.spawn_translation(common::SAMPLE_SRT, common::API_KEY, None).unwrap();
    drop(handle.events);
    let result = handle.task.await.unwrap();

    assert_eq!(result, Err(RunError::Abandoned));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_spawnTranslation_withReceiverDroppedMidRun_shouldStopAtNextGroup() {
    let provider = MockProvider::new(MockBehavior::Slow { delay_ms: 100 });
    let mut config = Config::default();
    config.translation.max_tokens_per_group = 20;
    let service = common::service_with(&provider, config);
    let content = (1..=4)
        .map(|i| format!("{}\n00:00:0{},000 --> 00:00:0{},500\nLine number {}", i, i, i, i))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut handle = service.spawn_translation(&content, common::API_KEY, None).unwrap();
    let first = handle.events.recv().await.unwrap();
    assert_eq!(first.progress().unwrap().kind, ProgressKind::Progress);
    drop(handle.events);
    let result = handle.task.await.unwrap();

    assert_eq!(result, Err(RunError::Abandoned));
    // the group already in flight finishes, the ones after it are never sent
    assert_eq!(provider.request_count(), 2);
}
