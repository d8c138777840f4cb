//! Token budget collaborator used by the summarizer.

use crate::model_limits::{ModelLimitsSource, ModelRegistry};
use crate::token_counter::TokenCounter;

/// Reports how large a model's context is and how many tokens a string costs.
///
/// `token_length` must return the same value for the same `(text, model)`.
pub trait TokenBudgeter {
    fn max_context_tokens(&self, model: &str) -> u32;
    fn token_length(&self, text: &str, model: &str) -> u32;
}

impl<T: TokenBudgeter + ?Sized> TokenBudgeter for &T {
    fn max_context_tokens(&self, model: &str) -> u32 {
        (**self).max_context_tokens(model)
    }

    fn token_length(&self, text: &str, model: &str) -> u32 {
        (**self).token_length(text, model)
    }
}

/// Default budgeter: tiktoken counts plus the model registry.
#[derive(Debug, Clone, Default)]
pub struct TiktokenBudgeter {
    counter: TokenCounter,
    registry: ModelRegistry,
}

impl TiktokenBudgeter {
    #[must_use]
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            counter: TokenCounter::new(),
            registry,
        }
    }
}

impl TokenBudgeter for TiktokenBudgeter {
    fn max_context_tokens(&self, model: &str) -> u32 {
        let resolved = self.registry.get(model);
        if resolved.source() == ModelLimitsSource::DefaultFallback {
            tracing::warn!(
                model,
                context_window = resolved.limits().context_window(),
                "Unknown model, using default context window"
            );
        }
        resolved.limits().context_window()
    }

    fn token_length(&self, text: &str, model: &str) -> u32 {
        self.counter.count_for_model(text, model)
    }
}
