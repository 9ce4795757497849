/*!
 * Mock provider implementations for testing.
 *
 * - `MockProvider::working()` - tags every unit with the target language
 * - `MockProvider::dropping_last()` - always returns one unit too few
 * - `MockProvider::merging_first_two()` - joins the first two units with a space
 * - `MockProvider::intermittent(n)` - fails every nth request
 * - `MockProvider::failing()` - always fails with an error
 * - `MockProvider::unauthorized()` - always rejects the credential
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::language_utils::LanguageCode;
use crate::providers::Provider;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with one output per input
    Working,
    /// Drops the last unit of every reply
    DropLast,
    /// Merges the first two units into one, space separated
    MergeFirstTwo,
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Always answers as if the API key were refused
    Unauthorized,
}

/// Custom per-unit translation used by `Working`
pub type UnitTranslator = fn(&str, &LanguageCode) -> String;

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
    translator: Option<UnitTranslator>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            translator: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn dropping_last() -> Self {
        Self::new(MockBehavior::DropLast)
    }

    pub fn merging_first_two() -> Self {
        Self::new(MockBehavior::MergeFirstTwo)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn unauthorized() -> Self {
        Self::new(MockBehavior::Unauthorized)
    }

    /// Replace the default `[lang] text` output
    pub fn with_translator(mut self, translator: UnitTranslator) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Number of requests served so far, shared between clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn translate_one(&self, unit: &str, target: &LanguageCode) -> String {
        match self.translator {
            Some(translator) => translator(unit, target),
            None => format!("[{}] {}", target, unit),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            translator: self.translator,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn translate_units(&self, units: &[String], target: &LanguageCode) -> Result<Vec<String>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        let translated: Vec<String> = units.iter().map(|u| self.translate_one(u, target)).collect();

        match self.behavior {
            MockBehavior::Working => Ok(translated),

            MockBehavior::DropLast => {
                let mut translated = translated;
                translated.pop();
                Ok(translated)
            }

            MockBehavior::MergeFirstTwo => {
                if units.len() < 2 {
                    return Ok(translated);
                }
                // Merge the raw inputs so each side stays one whitespace token
                let mut merged = vec![format!("{} {}", units[0], units[1])];
                merged.extend(translated.into_iter().skip(2));
                Ok(merged)
            }

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        status_code: 500,
                        message: format!("Simulated intermittent failure (request {})", count + 1),
                    })
                } else {
                    Ok(translated)
                }
            }

            MockBehavior::Failing => Err(ProviderError::ConnectionError(
                "Simulated connection failure".to_string(),
            )),

            MockBehavior::Unauthorized => Err(ProviderError::from_status(
                401,
                "Simulated invalid API key".to_string(),
            )),
        }
    }
}
