//! Rolling conversation summary for a long-running agent.
//!
//! This crate provides:
//! - The message history store with its running summary and trim cursor
//! - History trimming against the agent's active message chain
//! - Batched, token-budgeted summary updates through a fast model
//! - Token counting via tiktoken and per-model context limits
//! - An audit trail of summary prompts and results
//!
//! # Architecture
//!
//! ```text
//! HistoryTrimmer
//! └── summarizer: BatchSummarizer
//!     ├── completion: impl CompletionService (ProviderCompletion over HTTP)
//!     ├── budgeter: impl TokenBudgeter (TiktokenBudgeter = TokenCounter + ModelRegistry)
//!     ├── audit: impl AuditSink (FileAuditSink / TracingAuditSink / NullAuditSink)
//!     └── settings: SummarySettings
//!
//! MessageHistory (owned by the caller, borrowed &mut per trim)
//! ├── cycles: Vec<MessageCycle>
//! ├── summary: String
//! └── last_trimmed_index: usize
//! ```

mod atomic_write;
mod audit;
mod budget;
mod completion;
mod history;
mod model_limits;
mod normalize;
mod payload;
mod summarization;
mod token_counter;
mod trim;

#[cfg(test)]
mod test_support;

pub use atomic_write::{AtomicWriteOptions, atomic_write, atomic_write_with_options};
pub use audit::{
    AuditError, AuditLabel, AuditPayload, AuditSink, ConversationId, FileAuditSink,
    NullAuditSink, TracingAuditSink,
};
pub use budget::{TiktokenBudgeter, TokenBudgeter};
pub use completion::{CompletionError, CompletionService, ProviderCompletion};
pub use history::{HistoryError, INITIAL_SUMMARY, MessageHistory};
pub use model_limits::{ModelLimits, ModelLimitsSource, ModelRegistry, ResolvedModelLimits};
pub use normalize::normalize_events;
pub use payload::{MalformedPayload, extract_structured_payload};
pub use summarization::{
    BatchSummarizer, DEFAULT_FAST_MODEL, DEFAULT_PROMPT_TEMPLATE_OVERHEAD, SummaryError,
    SummarySettings, build_summary_prompt, render_event,
};
pub use token_counter::TokenCounter;
pub use trim::{HistoryTrimmer, Trimmed};
