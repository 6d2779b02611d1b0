/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use legenda::app_config::{Config, LogLevel, TargetLanguage};
use crate::common;

/// A missing config file is created with defaults
#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("legenda.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.translation.max_tokens_per_group, 700);
    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(written["target_language"], "pt-BR");
    assert_eq!(written["translation"]["quota_cooldown_secs"], 65);
    assert!(written.get("api_key").is_none());
    Ok(())
}

/// Values in an existing file win over defaults
#[test]
fn test_loadOrCreate_withExistingFile_shouldReadIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "custom.json",
        r#"{"log_level": "debug", "translation": {"model": "gemini-1.5-flash", "max_tokens_per_group": 350}}"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.translation.model, "gemini-1.5-flash");
    assert_eq!(config.translation.max_tokens_per_group, 350);
    assert_eq!(config.translation.max_attempts, 3);
    assert_eq!(config.target_language, TargetLanguage::BrazilianPortuguese);
    assert!(config.validate().is_ok());
    Ok(())
}

/// Broken JSON is reported, not replaced
#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "broken.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    assert_eq!(std::fs::read_to_string(&path)?, "{ not json");
    Ok(())
}

/// Endpoints must be URLs and temperatures within range
#[test]
fn test_validate_withBadEndpointOrTemperature_shouldFail() {
    let mut config = Config::default();
    config.translation.endpoint = "not a url".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.temperature = Some(3.5);
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.max_attempts = 0;
    assert!(config.validate().is_err());
}
