/*!
 * Core translation service implementation.
 *
 * `TranslationService` wires the provider, the token counter, the retry
 * controller and the orchestrator together from the configuration, and is
 * the entry point for running a document or checking a credential.
 */

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::app_config::Config;
use crate::errors::{RunError, SubtitleError, TranslationError};
use crate::providers::Provider;
use crate::providers::gemini::Gemini;
use crate::subtitle_processor::{Segment, SubtitleCollection};
use super::batch::Batcher;
use super::client::{TranslationClient, TranslationRequest};
use super::orchestrator::{EventSink, Orchestrator, RunEvent, RunOutput};
use super::prompts::context_from_filename;
use super::retry::{RetryController, RetryPolicy};
use super::tokens::{BpeTokenCounter, TokenCounter};

/// Text sent when checking a credential
const VALIDATION_MESSAGE: &str = "Hello, this is a test message to validate the API key.";

/// Outcome of a credential check
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialCheck {
    /// The service accepted the credential
    Valid,

    /// The credential is malformed or was refused
    Rejected { message: String },

    /// The check failed for another reason (quota, network, service error)
    Unavailable { message: String },
}

impl CredentialCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// A spawned run: its task and the receiving end of its events
#[derive(Debug)]
pub struct RunHandle {
    /// Resolves when the run is over
    pub task: JoinHandle<Result<RunOutput, RunError>>,

    /// Events in emission order
    pub events: UnboundedReceiver<RunEvent>,
}

/// Translation service for subtitle documents
#[derive(Debug, Clone)]
pub struct TranslationService {
    /// Application configuration
    config: Config,

    /// Shared with spawned runs
    orchestrator: Arc<Orchestrator>,
}

impl TranslationService {
    /// Create a service talking to the Gemini API
    pub fn new(config: Config) -> Result<Self> {
        let t = &config.translation;
        let provider = Gemini::new(&t.endpoint, &t.model, Duration::from_secs(t.timeout_secs))
            .with_temperature(t.temperature);
        Self::with_provider(config, Arc::new(provider))
    }

    /// Create a service over any provider, counting tokens with o200k_base
    pub fn with_provider(config: Config, provider: Arc<dyn Provider>) -> Result<Self> {
        let counter = BpeTokenCounter::new().context("Failed to load the token counter")?;
        Ok(Self::with_components(config, provider, Arc::new(counter)))
    }

    /// Create a service from explicit parts
    pub fn with_components(config: Config, provider: Arc<dyn Provider>, counter: Arc<dyn TokenCounter>) -> Self {
        let t = &config.translation;
        let client = TranslationClient::new(provider, t);
        let controller = RetryController::new(client, RetryPolicy::from_config(t));
        let batcher = Batcher::new(counter, t.max_tokens_per_group);
        let orchestrator = Orchestrator::new(batcher, controller, config.target_language);

        Self {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Requests issued so far through the translation client
    pub fn calls(&self) -> usize {
        self.orchestrator.controller().client().calls()
    }

    /// Run one translation to completion, emitting events on `sink`
    pub async fn translate_segments(
        &self,
        segments: &[Segment],
        api_key: &str,
        context: Option<&str>,
        sink: &EventSink,
    ) -> Result<RunOutput, RunError> {
        self.orchestrator.run(segments, api_key, context, sink).await
    }

    /// Parse a document and start its run in the background.
    ///
    /// The filename, when given, becomes the context line of the
    /// instruction. Dropping the returned receiver abandons the run before
    /// its next group.
    pub fn spawn_translation(
        &self,
        content: &str,
        api_key: impl Into<String>,
        filename: Option<&Path>,
    ) -> Result<RunHandle, SubtitleError> {
        let collection = SubtitleCollection::parse(filename.unwrap_or(Path::new("")), content)?;
        let context = context_from_filename(&collection.source_file);
        let api_key = api_key.into();
        let orchestrator = Arc::clone(&self.orchestrator);
        let (sink, events) = EventSink::channel();

        info!(
            "Starting run for {} segments of {}",
            collection.segments.len(),
            collection.source_file.display()
        );
        let task = tokio::spawn(async move {
            orchestrator
                .run(&collection.segments, &api_key, context.as_deref(), &sink)
                .await
        });

        Ok(RunHandle { task, events })
    }

    /// Check a credential with one minimal request
    pub async fn validate_credentials(&self, api_key: &str) -> CredentialCheck {
        let client = self.orchestrator.controller().client();
        let request = TranslationRequest::new(VALIDATION_MESSAGE, self.config.target_language, api_key);

        match client.translate(&request).await {
            Ok(_) | Err(TranslationError::Truncated { .. }) => {
                info!("API key accepted by {}", client.provider_name());
                CredentialCheck::Valid
            }
            Err(TranslationError::Auth { message }) => {
                warn!("API key rejected: {}", message);
                CredentialCheck::Rejected { message }
            }
            Err(error) => {
                warn!("Could not validate API key: {}", error);
                CredentialCheck::Unavailable {
                    message: error.to_string(),
                }
            }
        }
    }
}
