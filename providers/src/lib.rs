//! LLM provider clients for one-shot (non-streaming) completions.
//!
//! # Architecture
//!
//! - [`ProviderClient::complete`] - Unified entry point that dispatches on the model name
//! - [`openai`] - OpenAI Chat Completions API (and any compatible server)
//! - [`claude`] - Anthropic Messages API
//! - [`retry`] - Backoff policy shared by both
//!
//! The provider is inferred from the model identifier (`claude-*` goes to
//! Anthropic, everything else to OpenAI), so callers only ever pass the model
//! name they already have in configuration.
//!
//! # Error Handling
//!
//! Every failure comes back as a [`ProviderError`]. Nothing is retried above
//! the retry layer; once a request has exhausted its attempts the error is
//! returned to the caller unchanged.

pub mod claude;
pub mod openai;
pub mod retry;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use chronicle_types::{Message, Role};

pub use chronicle_types;

/// Canonical OpenAI API base URL.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";
/// Canonical Anthropic API base URL.
pub const ANTHROPIC_API_BASE_URL: &str = "https://api.anthropic.com/v1";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

// Note: reqwest only exposes tcp_keepalive (idle time); interval/retries use platform defaults.
const TCP_KEEPALIVE_SECS: u64 = 60;

const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Claude,
}

impl Provider {
    /// Infer the provider that serves `model`.
    #[must_use]
    pub fn for_model(model: &str) -> Self {
        if model.trim().to_ascii_lowercase().starts_with("claude") {
            Provider::Claude
        } else {
            Provider::OpenAI
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Claude => "Anthropic",
        }
    }

    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Claude => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no API key configured for {0} (set {env})", env = .0.env_var())]
    MissingApiKey(Provider),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{provider} request failed: {message}")]
    Transport { provider: Provider, message: String },
    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: Provider,
        status: u16,
        body: String,
    },
    #[error("unexpected {provider} response: {detail}")]
    MalformedResponse { provider: Provider, detail: String },
}

/// Connection settings for the provider clients.
#[derive(Clone)]
pub struct ProviderSettings {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub request_timeout: Duration,
    pub retry: retry::RetryConfig,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            openai_base_url: OPENAI_API_BASE_URL.to_string(),
            anthropic_base_url: ANTHROPIC_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: retry::RetryConfig::default(),
        }
    }
}

// Manual Debug impl to prevent leaking API keys in logs.
impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(opt: Option<&String>) -> &'static str {
            if opt.is_some() { "[REDACTED]" } else { "None" }
        }
        f.debug_struct("ProviderSettings")
            .field("openai_api_key", &mask(self.openai_api_key.as_ref()))
            .field("anthropic_api_key", &mask(self.anthropic_api_key.as_ref()))
            .field("openai_base_url", &self.openai_base_url)
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ProviderSettings {
    fn api_key(&self, provider: Provider) -> Result<&str, ProviderError> {
        let key = match provider {
            Provider::OpenAI => self.openai_api_key.as_deref(),
            Provider::Claude => self.anthropic_api_key.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
            .ok_or(ProviderError::MissingApiKey(provider))
    }

    /// Plain HTTP is only allowed when the user pointed a base URL at it.
    fn requires_https(&self) -> bool {
        self.openai_base_url.starts_with("https://")
            && self.anthropic_base_url.starts_with("https://")
    }
}

fn base_client_builder() -> reqwest::ClientBuilder {
    use reqwest::header::{HeaderMap, HeaderValue};

    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        "X-Client-OS",
        HeaderValue::from_static(std::env::consts::OS),
    );
    default_headers.insert(
        "X-Client-Arch",
        HeaderValue::from_static(std::env::consts::ARCH),
    );

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
}

/// Read an error response body, capped so a misbehaving server can't make us
/// buffer megabytes of HTML into a log line.
pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    let mut body = match response.bytes().await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => return format!("<failed to read error: {e}>"),
    };
    if body.len() > MAX_ERROR_BODY_BYTES {
        body.truncate(MAX_ERROR_BODY_BYTES);
        let text = String::from_utf8_lossy(&body);
        return format!("{text}...(truncated)");
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Map our roles onto the three roles provider APIs accept.
#[must_use]
pub fn api_role(role: &Role) -> &'static str {
    match role {
        Role::System | Role::YourComputer => "system",
        Role::Assistant | Role::You => "assistant",
        Role::User | Role::Other(_) => "user",
    }
}

/// Turn a retry outcome into a successful response or a typed error.
pub(crate) async fn into_success(
    provider: Provider,
    outcome: retry::RetryOutcome,
) -> Result<reqwest::Response, ProviderError> {
    match outcome {
        retry::RetryOutcome::Success(response) => Ok(response),
        retry::RetryOutcome::HttpError(response) => {
            let status = response.status().as_u16();
            let body = read_capped_error_body(response).await;
            Err(ProviderError::Api {
                provider,
                status,
                body,
            })
        }
        retry::RetryOutcome::ConnectionError { attempts, source } => {
            Err(ProviderError::Transport {
                provider,
                message: format!("connection error after {attempts} attempts: {source}"),
            })
        }
        retry::RetryOutcome::NonRetryable(source) => Err(ProviderError::Transport {
            provider,
            message: source.to_string(),
        }),
    }
}

/// A completion client shared by every call in a conversation.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    settings: ProviderSettings,
}

impl ProviderClient {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let http = base_client_builder()
            .https_only(settings.requires_https())
            .timeout(settings.request_timeout)
            .build()
            .map_err(ProviderError::Client)?;
        Ok(Self { http, settings })
    }

    #[must_use]
    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Send `messages` to `model` and return the reply as an assistant message.
    pub async fn complete(
        &self,
        messages: &[Message],
        model: &str,
    ) -> Result<Message, ProviderError> {
        let provider = Provider::for_model(model);
        let api_key = self.settings.api_key(provider)?;

        tracing::debug!(
            %provider,
            model,
            message_count = messages.len(),
            "Sending completion request"
        );

        let text = match provider {
            Provider::OpenAI => {
                openai::complete(
                    &self.http,
                    &self.settings.openai_base_url,
                    api_key,
                    model,
                    messages,
                    &self.settings.retry,
                    self.settings.request_timeout,
                )
                .await?
            }
            Provider::Claude => {
                claude::complete(
                    &self.http,
                    &self.settings.anthropic_base_url,
                    api_key,
                    model,
                    messages,
                    &self.settings.retry,
                    self.settings.request_timeout,
                )
                .await?
            }
        };

        Ok(Message::assistant(text))
    }
}
