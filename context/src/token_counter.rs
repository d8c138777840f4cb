//! Token counting using tiktoken.
//!
//! Each model is measured with its own encoding family as reported by
//! `tiktoken_rs::tokenizer::get_tokenizer`. Models tiktoken does not know
//! (Claude, local models) are measured with `o200k_base`, which is close
//! enough for batching; the summarizer only needs counts that are stable for
//! equal input.

use std::sync::OnceLock;
use tiktoken_rs::tokenizer::{Tokenizer, get_tokenizer};
use tiktoken_rs::{CoreBPE, cl100k_base, o200k_base, p50k_base, r50k_base};

/// Encoding families with a cached encoder each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    O200k,
    Cl100k,
    P50k,
    R50k,
}

impl Encoding {
    fn for_model(model: &str) -> Self {
        match get_tokenizer(model) {
            Some(Tokenizer::Cl100kBase) => Encoding::Cl100k,
            Some(Tokenizer::P50kBase | Tokenizer::P50kEdit) => Encoding::P50k,
            Some(Tokenizer::R50kBase | Tokenizer::Gpt2) => Encoding::R50k,
            _ => Encoding::O200k,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Encoding::O200k => "o200k_base",
            Encoding::Cl100k => "cl100k_base",
            Encoding::P50k => "p50k_base",
            Encoding::R50k => "r50k_base",
        }
    }
}

/// The tiktoken encoders are expensive to initialize (they load vocabulary
/// data), so each family is created once and shared by every `TokenCounter`.
static O200K: OnceLock<Option<CoreBPE>> = OnceLock::new();
static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();
static P50K: OnceLock<Option<CoreBPE>> = OnceLock::new();
static R50K: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn get_encoder(encoding: Encoding) -> Option<&'static CoreBPE> {
    let cell = match encoding {
        Encoding::O200k => &O200K,
        Encoding::Cl100k => &CL100K,
        Encoding::P50k => &P50K,
        Encoding::R50k => &R50K,
    };

    cell.get_or_init(|| {
        let loaded = match encoding {
            Encoding::O200k => o200k_base(),
            Encoding::Cl100k => cl100k_base(),
            Encoding::P50k => p50k_base(),
            Encoding::R50k => r50k_base(),
        };
        match loaded {
            Ok(encoder) => Some(encoder),
            Err(err) => {
                tracing::error!(
                    encoding = encoding.name(),
                    error = %err,
                    "Failed to initialize tiktoken encoder. Falling back to byte-length estimates."
                );
                None
            }
        }
    })
    .as_ref()
}

/// Thread-safe approximate token counter.
///
/// Falls back to byte length when an encoder cannot be loaded, which
/// overestimates and therefore errs on the side of smaller batches.
///
/// # Example
///
/// ```
/// use chronicle_context::TokenCounter;
///
/// let counter = TokenCounter::new();
/// assert!(counter.count_str("Hello, world!") > 0);
/// assert!(counter.count_for_model("Hello, world!", "gpt-3.5-turbo") > 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter;

impl TokenCounter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Tokens in `text` under the default `o200k_base` encoding.
    #[must_use]
    pub fn count_str(&self, text: &str) -> u32 {
        count_with(Encoding::O200k, text)
    }

    /// Tokens in `text` under the encoding `model` uses.
    #[must_use]
    pub fn count_for_model(&self, text: &str, model: &str) -> u32 {
        count_with(Encoding::for_model(model), text)
    }
}

fn count_with(encoding: Encoding, text: &str) -> u32 {
    let len = match get_encoder(encoding) {
        Some(encoder) => encoder.encode_ordinary(text).len(),
        None => text.len(),
    };

    u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{Encoding, TokenCounter};

    #[test]
    fn count_str_empty_string() {
        let counter = TokenCounter::new();
        assert_eq!(counter.count_str(""), 0);
    }

    #[test]
    fn count_str_longer_text() {
        let counter = TokenCounter::new();

        let text = "The quick brown fox jumps over the lazy dog.";
        let tokens = counter.count_str(text);

        assert!(tokens >= 5);
        assert!(tokens <= 20);
    }

    #[test]
    fn consistent_token_counts() {
        let counter = TokenCounter::new();
        let other = TokenCounter::default();
        let text = "This is a test sentence for token counting.";

        assert_eq!(counter.count_str(text), counter.count_str(text));
        assert_eq!(counter.count_str(text), other.count_str(text));
    }

    #[test]
    fn models_map_to_their_encoding_family() {
        assert_eq!(Encoding::for_model("gpt-3.5-turbo"), Encoding::Cl100k);
        assert_eq!(Encoding::for_model("gpt-4"), Encoding::Cl100k);
        assert_eq!(Encoding::for_model("gpt-4o"), Encoding::O200k);
        assert_eq!(Encoding::for_model("claude-sonnet-4-5"), Encoding::O200k);
        assert_eq!(Encoding::for_model("my-local-model"), Encoding::O200k);
    }

    #[test]
    fn gpt_35_is_counted_with_cl100k() {
        let counter = TokenCounter::new();
        let text = "記憶を要約してください。".repeat(50);
        let expected = tiktoken_rs::cl100k_base()
            .expect("cl100k_base")
            .encode_ordinary(&text)
            .len();

        assert_eq!(
            counter.count_for_model(&text, "gpt-3.5-turbo") as usize,
            expected
        );
    }

    #[test]
    fn unknown_models_use_default_encoding() {
        let counter = TokenCounter::new();
        let text = "I wrote the report to notes.txt.";

        assert_eq!(
            counter.count_for_model(text, "claude-haiku-4-5"),
            counter.count_str(text)
        );
    }
}
