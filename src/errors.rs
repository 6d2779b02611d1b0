/*!
 * Error types for the legenda application.
 *
 * Provider errors describe what went wrong talking to the remote service.
 * Translation errors are the classified outcome the orchestration core
 * reacts to: authentication, quota, truncation or anything transient.
 */

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The service answered without any text
    #[error("Empty response from provider")]
    EmptyResponse,
}

/// Serializable tag for a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Auth,
    Quota,
    Truncated,
    Transient,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auth => "auth",
            Self::Quota => "quota",
            Self::Truncated => "truncated",
            Self::Transient => "transient",
        };
        write!(f, "{}", name)
    }
}

/// Classified outcome of a failed translation request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// The credential is malformed or was rejected. Never retried.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// The service reported rate limiting or quota exhaustion
    #[error("Quota exceeded, retry after {retry_after_secs}s: {message}")]
    Quota { message: String, retry_after_secs: u64 },

    /// The response held fewer delimited segments than were sent
    #[error("Truncated response: expected {expected} segments, received {received}")]
    Truncated { expected: usize, received: usize },

    /// Network failures, malformed responses, unknown service errors
    #[error("Transient failure: {0}")]
    Transient(String),
}

impl TranslationError {
    /// The serializable kind of this error
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Auth { .. } => FailureKind::Auth,
            Self::Quota { .. } => FailureKind::Quota,
            Self::Truncated { .. } => FailureKind::Truncated,
            Self::Transient(_) => FailureKind::Transient,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, Self::Quota { .. })
    }
}

/// Why a run stopped without a result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunError {
    /// A failure that aborts the whole run
    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// The caller dropped the event receiver
    #[error("Run abandoned: nobody is listening for events")]
    Abandoned,
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubtitleError {
    /// The document held no subtitle blocks
    #[error("No subtitle blocks found")]
    Empty,

    /// A block could not be read as index, time range and text
    #[error("Malformed subtitle block {block}: {reason}")]
    MalformedBlock { block: usize, reason: String },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Translation(TranslationError::Auth { .. }) => 2,
            Self::Translation(TranslationError::Quota { .. }) => 3,
            _ => 1,
        }
    }
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        // Keep the classification when a translation error was wrapped in context
        match error.downcast::<TranslationError>() {
            Ok(translation_error) => Self::Translation(translation_error),
            Err(error) => Self::Unknown(format!("{:#}", error)),
        }
    }
}

impl From<RunError> for AppError {
    fn from(error: RunError) -> Self {
        match error {
            RunError::Translation(error) => Self::Translation(error),
            RunError::Abandoned => Self::Unknown(RunError::Abandoned.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
