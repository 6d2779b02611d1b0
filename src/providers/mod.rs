/*!
 * Provider implementations for remote text generation.
 *
 * A provider turns one prompt into one text, or a raw `ProviderError`.
 * Classification of those errors happens in the translation client, so any
 * service can be substituted by implementing `Provider`:
 * - Gemini: Google Generative Language API
 * - Mock: scripted behaviour for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// One text generation request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction guiding the model
    pub system: Option<String>,

    /// User content
    pub prompt: String,

    /// Credential sent with this request
    pub api_key: String,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            api_key: api_key.into(),
        }
    }

    /// Set the system instruction
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Common trait for all text generation providers
///
/// Implementations keep no state between calls that affects the outcome.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request and return the generated text
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The generated text or the raw failure
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

pub mod gemini;
pub mod mock;
