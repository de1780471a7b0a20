//! Translation gateway boundary.
//!
//! The relay treats machine translation as an opaque call: normalized text
//! plus a source/target pair in, translated text out. The trait allows
//! swapping implementations (real LLM vs mock).

pub mod llm;

use crate::error::Result;
use crate::lang::Language;
use serde::{Deserialize, Serialize};

pub use llm::LlmGateway;

/// Output of a gateway call. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Normalized source text the translation was produced from.
    pub source_text: String,
    /// Translated text.
    pub translated_text: String,
    /// Detected source language.
    pub source_lang: Language,
    /// Target language, always distinct from the source.
    pub target_lang: Language,
}

/// Trait for translation backends.
#[async_trait::async_trait]
pub trait TranslationGateway: Send + Sync {
    /// Translate `text` from `source` into `target`.
    ///
    /// # Arguments
    /// * `text` - Normalized source text (trimmed, whitespace collapsed)
    /// * `source` - Detected source language
    /// * `target` - Target language
    ///
    /// # Returns
    /// The translation result or a typed gateway failure. The relay does
    /// not retry; the next fragment tries fresh.
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<TranslationResult>;
}

/// Mock gateway for testing.
///
/// Records every call and answers with a deterministic pseudo-translation,
/// or fails when configured to.
#[derive(Debug, Default)]
pub struct MockGateway {
    calls: std::sync::Mutex<Vec<(String, Language)>>,
    fail: std::sync::atomic::AtomicBool,
    delay_ms: std::sync::atomic::AtomicU64,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail with a gateway error.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Delay subsequent calls, simulating gateway latency.
    pub fn set_delay(&self, delay: std::time::Duration) {
        self.delay_ms.store(
            delay.as_millis() as u64,
            std::sync::atomic::Ordering::SeqCst,
        );
    }

    /// Texts and source languages of every call so far.
    pub fn calls(&self) -> Vec<(String, Language)> {
        self.calls.lock().expect("mock gateway lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl TranslationGateway for MockGateway {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<TranslationResult> {
        self.calls
            .lock()
            .expect("mock gateway lock poisoned")
            .push((text.to_string(), source));

        let delay = self.delay_ms.load(std::sync::atomic::Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }

        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(crate::error::RelayError::Gateway {
                message: "mock failure".to_string(),
            });
        }

        Ok(TranslationResult {
            source_text: text.to_string(),
            translated_text: format!("{}:{}", target.code(), text),
            source_lang: source,
            target_lang: target,
        })
    }
}
