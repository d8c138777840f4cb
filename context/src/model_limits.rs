//! Model context limits and registry.
//!
//! [`ModelLimits`] holds the context window of one model; [`ModelRegistry`]
//! resolves a model identifier to its limits via exact overrides, then known
//! prefixes, then an explicit fallback.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelLimits {
    /// Total context window in tokens (prompt + completion).
    context_window: u32,
}

impl ModelLimits {
    #[must_use]
    pub const fn new(context_window: u32) -> Self {
        Self { context_window }
    }

    #[must_use]
    pub const fn context_window(&self) -> u32 {
        self.context_window
    }
}

/// Where model limits came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelLimitsSource {
    /// Exact match from an override.
    Override,
    /// Matched a known prefix (the matched prefix).
    Prefix(&'static str),
    /// Fell back to `DEFAULT_LIMITS` because no match was found.
    DefaultFallback,
}

/// Result of looking up model limits.
///
/// This makes the "fallback OR real data" decision explicit at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedModelLimits {
    limits: ModelLimits,
    source: ModelLimitsSource,
}

impl ResolvedModelLimits {
    #[must_use]
    pub const fn new(limits: ModelLimits, source: ModelLimitsSource) -> Self {
        Self { limits, source }
    }

    #[must_use]
    pub const fn limits(self) -> ModelLimits {
        self.limits
    }

    #[must_use]
    pub const fn source(self) -> ModelLimitsSource {
        self.source
    }
}

/// Fallback for unknown models.
const DEFAULT_LIMITS: ModelLimits = ModelLimits::new(8192);

/// Known model prefixes and their limits.
///
/// Ordered by specificity (more specific prefixes first) to ensure
/// correct matching when multiple prefixes could match.
const KNOWN_MODELS: &[(&str, ModelLimits)] = &[
    // GPT-3.5
    ("gpt-3.5-turbo-16k", ModelLimits::new(16_384)),
    ("gpt-3.5-turbo", ModelLimits::new(4096)),
    // GPT-4 family
    ("gpt-4-32k", ModelLimits::new(32_768)),
    ("gpt-4-turbo", ModelLimits::new(128_000)),
    ("gpt-4o-mini", ModelLimits::new(128_000)),
    ("gpt-4o", ModelLimits::new(128_000)),
    ("gpt-4.1", ModelLimits::new(1_047_576)),
    ("gpt-4", ModelLimits::new(8191)),
    // GPT-5 family
    ("gpt-5", ModelLimits::new(400_000)),
    // Claude
    ("claude-opus-4", ModelLimits::new(200_000)),
    ("claude-sonnet-4", ModelLimits::new(200_000)),
    ("claude-haiku-4-5", ModelLimits::new(200_000)),
    ("claude-3-5", ModelLimits::new(200_000)),
    ("claude-3", ModelLimits::new(200_000)),
];

/// Registry of known model limits with support for custom overrides.
///
/// # Prefix Matching
///
/// - `"gpt-3.5-turbo-0613"` matches prefix `"gpt-3.5-turbo"`
/// - `"gpt-4-0613"` matches prefix `"gpt-4"`
/// - `"claude-haiku-4-5-20251001"` matches prefix `"claude-haiku-4-5"`
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    overrides: HashMap<String, ModelLimits>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_overrides(overrides: HashMap<String, ModelLimits>) -> Self {
        Self { overrides }
    }

    /// Lookup order: exact override, known prefix, default fallback.
    #[must_use]
    pub fn get(&self, model: &str) -> ResolvedModelLimits {
        if let Some(limits) = self.overrides.get(model) {
            return ResolvedModelLimits::new(*limits, ModelLimitsSource::Override);
        }

        for (prefix, limits) in KNOWN_MODELS {
            if model.starts_with(prefix) {
                return ResolvedModelLimits::new(*limits, ModelLimitsSource::Prefix(prefix));
            }
        }

        ResolvedModelLimits::new(DEFAULT_LIMITS, ModelLimitsSource::DefaultFallback)
    }

    pub fn set_override(&mut self, model: impl Into<String>, limits: ModelLimits) {
        self.overrides.insert(model.into(), limits);
    }

    #[must_use]
    pub fn has_override(&self, model: &str) -> bool {
        self.overrides.contains_key(model)
    }
}
