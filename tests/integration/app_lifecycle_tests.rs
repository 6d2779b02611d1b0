/*!
 * Full application lifecycle tests: read, translate, write
 */

use anyhow::Result;
use std::fs;

use legenda::app_controller::{Controller, EventOutput, TranslateOptions};
use legenda::errors::AppError;
use legenda::providers::mock::MockProvider;
use crate::common;

fn silent(options: TranslateOptions) -> TranslateOptions {
    TranslateOptions {
        output: EventOutput::Silent,
        ..options
    }
}

#[tokio::test]
async fn test_run_withSubtitleFile_shouldWriteTranslationNextToInput() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "Episode.S01E02.srt", common::SAMPLE_SRT)?;
    let provider = MockProvider::working();
    let controller = Controller::with_service(common::service(&provider));

    let written = controller.run(&silent(TranslateOptions::new(&input)), common::API_KEY).await?;

    assert_eq!(written, temp_dir.path().join("Episode.S01E02.pt-BR.srt"));
    let content = fs::read_to_string(&written)?;
    assert!(content.starts_with("1\n00:00:01,000 --> 00:00:02,500\n[TRANSLATED] Hello.\n\n2\n"));
    assert!(content.ends_with("[TRANSLATED] Thanks."));
    assert!(provider.requests()[0].system.as_deref().unwrap_or_default().contains("Episode S01E02"));
    Ok(())
}

#[tokio::test]
async fn test_run_withJsonLines_shouldStillWriteOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "movie.srt", common::SAMPLE_SRT)?;
    let output = temp_dir.path().join("out").join("movie-ptbr.srt");
    let controller = Controller::with_service(common::service(&MockProvider::working()));
    let options = TranslateOptions {
        output_file: Some(output.clone()),
        output: EventOutput::JsonLines,
        ..TranslateOptions::new(&input)
    };

    let written = controller.run(&options, common::API_KEY).await?;

    assert_eq!(written, output);
    assert!(output.exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withExistingOutput_shouldRequireForce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "movie.srt", common::SAMPLE_SRT)?;
    let existing = common::create_test_file(temp_dir.path(), "movie.pt-BR.srt", "old")?;
    let provider = MockProvider::working();
    let controller = Controller::with_service(common::service(&provider));

    let refused = controller.run(&silent(TranslateOptions::new(&input)), common::API_KEY).await;
    assert!(matches!(refused, Err(AppError::File(_))));
    assert_eq!(provider.request_count(), 0);
    assert_eq!(fs::read_to_string(&existing)?, "old");

    let forced = silent(TranslateOptions {
        force_overwrite: true,
        ..TranslateOptions::new(&input)
    });
    controller.run(&forced, common::API_KEY).await?;
    assert_ne!(fs::read_to_string(&existing)?, "old");
    Ok(())
}

#[tokio::test]
async fn test_run_withRejectedKey_shouldExitWithAuthCodeAndWriteNothing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "movie.srt", common::SAMPLE_SRT)?;
    let controller = Controller::with_service(common::service(&MockProvider::rejecting()));

    let error = controller
        .run(&silent(TranslateOptions::new(&input)), common::API_KEY)
        .await
        .unwrap_err();

    assert_eq!(error.exit_code(), 2);
    assert!(!temp_dir.path().join("movie.pt-BR.srt").exists());
    Ok(())
}

#[test]
fn test_run_withMalformedInput_shouldFailBeforeTranslating() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "broken.srt", "1\nnot a time range\nHello\n")?;
    let provider = MockProvider::working();
    let controller = Controller::with_service(common::service(&provider));

    let error = tokio_test::block_on(controller.run(&silent(TranslateOptions::new(&input)), common::API_KEY))
        .unwrap_err();

    assert!(matches!(error, AppError::Subtitle(_)));
    assert_eq!(error.exit_code(), 1);
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_validateKey_shouldMapOutcomesToExitCodes() {
    let valid = Controller::with_service(common::service(&MockProvider::working()));
    assert!(valid.validate_key(common::API_KEY).await.is_ok());

    let rejected = Controller::with_service(common::service(&MockProvider::rejecting()));
    assert_eq!(rejected.validate_key(common::API_KEY).await.unwrap_err().exit_code(), 2);

    let short = Controller::with_service(common::service(&MockProvider::working()));
    assert_eq!(short.validate_key("short").await.unwrap_err().exit_code(), 2);
}
