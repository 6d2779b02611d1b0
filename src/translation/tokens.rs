/*!
 * Token counting used to bound request sizes.
 *
 * Counters must be deterministic and monotonic: appending text never
 * lowers the count.
 */

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use std::fmt::Debug;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

/// Counts tokens in a piece of text
pub trait TokenCounter: Send + Sync + Debug {
    fn count(&self, text: &str) -> usize;
}

static O200K_BASE: Lazy<Option<Arc<CoreBPE>>> = Lazy::new(|| match tiktoken_rs::o200k_base() {
    Ok(bpe) => Some(Arc::new(bpe)),
    Err(e) => {
        log::error!("Failed to load o200k_base encoding: {}", e);
        None
    }
});

/// Subword counter backed by the o200k_base BPE
#[derive(Clone)]
pub struct BpeTokenCounter {
    bpe: Arc<CoreBPE>,
}

impl BpeTokenCounter {
    /// Shared counter, the encoding is loaded once per process
    pub fn new() -> Result<Self> {
        O200K_BASE
            .clone()
            .map(|bpe| Self { bpe })
            .ok_or_else(|| anyhow!("o200k_base encoding is unavailable"))
    }
}

impl Debug for BpeTokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BpeTokenCounter(o200k_base)")
    }
}

impl TokenCounter for BpeTokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Rough counter, one token per `chars_per_token` characters rounded up
#[derive(Debug, Clone, Copy)]
pub struct CharTokenCounter {
    chars_per_token: usize,
}

impl CharTokenCounter {
    pub fn new(chars_per_token: usize) -> Self {
        Self { chars_per_token: chars_per_token.max(1) }
    }
}

impl Default for CharTokenCounter {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenCounter for CharTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}
