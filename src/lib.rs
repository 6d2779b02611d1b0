/*!
 * # legenda - batch subtitle translation
 *
 * A Rust library for translating SubRip subtitles with a remote text
 * generation model, without ever losing track of which line is which.
 *
 * ## Features
 *
 * - Token-bounded batching of subtitle segments
 * - Retries with exponential backoff and a dedicated quota cool-down
 * - Recursive halving of batches the model answered only partially
 * - Exactly one output per input segment, falling back to the source text
 * - Progress events streamed over a channel, renderable as JSON lines
 * - Google Gemini provider, plus a scriptable mock for tests
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: SubRip parsing and rendering
 * - `translation`: The batch translation core:
 *   - `translation::batch`: Token-bounded grouping
 *   - `translation::client`: Single request and error classification
 *   - `translation::retry`: Backoff and quota handling
 *   - `translation::splitter`: Recursive splitting of truncated groups
 *   - `translation::orchestrator`: Runs and progress events
 *   - `translation::core`: Service wiring
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `providers`: Remote text generation clients:
 *   - `providers::gemini`: Google Gemini API client
 *   - `providers::mock`: Scripted provider for tests
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod subtitle_processor;
pub mod translation;
pub mod app_controller;
pub mod providers;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::Config;
pub use subtitle_processor::{Segment, SubtitleCollection};
pub use translation::TranslationService;
pub use errors::{AppError, ProviderError, RunError, SubtitleError, TranslationError};
