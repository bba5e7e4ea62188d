/*!
 * In-process translators for dry runs and tests.
 *
 * - `MockTranslator::echo()` - returns every sentence unchanged (dry run)
 * - `MockTranslator::working()` - prefixes every sentence with `[TRANSLATED]`
 * - `MockTranslator::failing()` - always fails
 * - `MockTranslator::fail_on_call(n)` - fails only on the n-th call
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::Translator;
use crate::app_config::Precision;
use crate::errors::TranslationError;

/// Behavior mode for the mock translator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Returns the input unchanged
    Echo,
    /// Always succeeds with a marked translation
    Working,
    /// Always fails with a request error
    Failing,
    /// Reports resource exhaustion on the given 1-based call, works otherwise
    FailOnCall { call: usize },
    /// Drops the last sentence of every answer
    WrongLength,
    /// Works after a delay
    Slow { delay_ms: u64 },
}

/// Mock translator; clones share the call counter
#[derive(Debug, Clone)]
pub struct MockTranslator {
    behavior: MockBehavior,
    calls: Arc<AtomicUsize>,
    /// Precision of the most recent call, 0 = full, 1 = half
    last_precision: Arc<AtomicUsize>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            last_precision: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn fail_on_call(call: usize) -> Self {
        Self::new(MockBehavior::FailOnCall { call })
    }

    /// Number of `translate` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Precision requested by the last call
    pub fn last_precision(&self) -> Precision {
        match self.last_precision.load(Ordering::SeqCst) {
            1 => Precision::Half,
            _ => Precision::Full,
        }
    }

    fn marked(sentences: &[String]) -> Vec<String> {
        sentences.iter().map(|s| format!("[TRANSLATED] {}", s)).collect()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        sentences: &[String],
        precision: Precision,
    ) -> Result<Vec<String>, TranslationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.last_precision.store(
            usize::from(precision == Precision::Half),
            Ordering::SeqCst,
        );

        match self.behavior {
            MockBehavior::Echo => Ok(sentences.to_vec()),

            MockBehavior::Working => Ok(Self::marked(sentences)),

            MockBehavior::Failing => Err(TranslationError::RequestFailed(
                "Simulated translator failure".to_string(),
            )),

            MockBehavior::FailOnCall { call: failing } if call == failing => {
                Err(TranslationError::ResourceExhausted(format!(
                    "Simulated out of memory (call #{})",
                    call
                )))
            }

            MockBehavior::FailOnCall { .. } => Ok(Self::marked(sentences)),

            MockBehavior::WrongLength => {
                let mut translations = Self::marked(sentences);
                translations.pop();
                Ok(translations)
            }

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(Self::marked(sentences))
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
