/*!
 * Batch translation of subtitle segments through a remote model.
 *
 * This module contains the orchestration core. It is split into several
 * submodules, leaves first:
 *
 * - `tokens`: Token counting used to size requests
 * - `batch`: Packing segments into token-bounded groups
 * - `prompts`: The fixed translation instruction
 * - `client`: One request, one classified outcome
 * - `retry`: Bounded retries, backoff and quota cool-downs
 * - `alignment`: Keeping one output per source segment
 * - `splitter`: Recursive halving of truncated groups
 * - `orchestrator`: Runs, progress events and final assembly
 * - `core`: The service wiring everything from configuration
 */

// Re-export main types for easier usage
pub use self::batch::{Batcher, Group};
pub use self::client::{TranslationClient, TranslationRequest};
pub use self::core::{CredentialCheck, RunHandle, TranslationService};
pub use self::orchestrator::{EventSink, Orchestrator, ProgressEvent, ProgressKind, RunEvent, RunOutput};
pub use self::retry::{QuotaHooks, RetryController, RetryPolicy};
pub use self::splitter::ChunkSplitter;
pub use self::tokens::{BpeTokenCounter, CharTokenCounter, TokenCounter};

// Submodules
pub mod alignment;
pub mod batch;
pub mod client;
pub mod core;
pub mod orchestrator;
pub mod prompts;
pub mod retry;
pub mod splitter;
pub mod tokens;
