//! Chronicle configuration.
//!
//! Loaded from `~/.chronicle/config.toml`, or the file named by
//! `CHRONICLE_CONFIG`. Every section is optional; a missing file means
//! defaults throughout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

use chronicle_context::{
    ConversationId, DEFAULT_FAST_MODEL, DEFAULT_PROMPT_TEMPLATE_OVERHEAD, INITIAL_SUMMARY,
    ModelLimits, ModelRegistry, SummarySettings,
};
use chronicle_providers::retry::RetryConfig;
use chronicle_providers::{ANTHROPIC_API_BASE_URL, OPENAI_API_BASE_URL, ProviderSettings};

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "CHRONICLE_CONFIG";

const DEFAULT_AGENT_NAME: &str = "chronicle";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct ChronicleConfig {
    pub app: Option<AppConfig>,
    pub summary: Option<SummaryConfig>,
    pub api_keys: Option<ApiKeys>,
    pub providers: Option<ProvidersConfig>,
    pub audit: Option<AuditConfig>,
    /// Per-model context window overrides, keyed by exact model id.
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Model used for summary updates.
    pub fast_model: Option<String>,
    /// Log raw content of malformed assistant replies.
    #[serde(default)]
    pub debug_mode: bool,
    pub agent_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryConfig {
    /// Summary a new history starts from.
    pub initial: Option<String>,
    pub prompt_template_overhead: Option<u32>,
}

#[derive(Default, Deserialize)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
}

// Manual Debug impl to prevent leaking API keys in logs.
impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(opt: Option<&String>) -> &'static str {
            if opt.is_some() { "[REDACTED]" } else { "None" }
        }
        f.debug_struct("ApiKeys")
            .field("openai", &mask(self.openai.as_ref()))
            .field("anthropic", &mask(self.anthropic.as_ref()))
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProvidersConfig {
    pub openai_base_url: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Root directory for audit records. `~/` is expanded.
    pub dir: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ModelConfig {
    pub context_window: u32,
}

/// Expand `${VAR}` references; unset variables become empty.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if var.is_empty() {
            out.push_str("${}");
        } else {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl ChronicleConfig {
    /// Load the config file if there is one.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn fast_model(&self) -> &str {
        self.app
            .as_ref()
            .and_then(|app| app.fast_model.as_deref())
            .unwrap_or(DEFAULT_FAST_MODEL)
    }

    #[must_use]
    pub fn agent_name(&self) -> &str {
        self.app
            .as_ref()
            .and_then(|app| app.agent_name.as_deref())
            .unwrap_or(DEFAULT_AGENT_NAME)
    }

    #[must_use]
    pub fn debug_mode(&self) -> bool {
        self.app.as_ref().is_some_and(|app| app.debug_mode)
    }

    #[must_use]
    pub fn initial_summary(&self) -> &str {
        self.summary
            .as_ref()
            .and_then(|summary| summary.initial.as_deref())
            .unwrap_or(INITIAL_SUMMARY)
    }

    #[must_use]
    pub fn summary_settings(&self, conversation: ConversationId) -> SummarySettings {
        let mut settings = SummarySettings::new(self.fast_model(), conversation);
        settings.debug_mode = self.debug_mode();
        settings.prompt_template_overhead = self
            .summary
            .as_ref()
            .and_then(|summary| summary.prompt_template_overhead)
            .unwrap_or(DEFAULT_PROMPT_TEMPLATE_OVERHEAD);
        settings
    }

    #[must_use]
    pub fn model_registry(&self) -> ModelRegistry {
        ModelRegistry::with_overrides(
            self.models
                .iter()
                .map(|(model, config)| (model.clone(), ModelLimits::new(config.context_window)))
                .collect(),
        )
    }

    /// Provider settings, with API keys falling back to the environment.
    #[must_use]
    pub fn provider_settings(&self) -> ProviderSettings {
        self.provider_settings_with_env(|name| env::var(name).ok())
    }

    fn provider_settings_with_env(
        &self,
        env_lookup: impl Fn(&str) -> Option<String>,
    ) -> ProviderSettings {
        let keys = self.api_keys.as_ref();
        let key = |configured: Option<&String>, env_var: &str| {
            configured
                .map(|value| expand_env_vars(value))
                .filter(|value| !value.trim().is_empty())
                .or_else(|| env_lookup(env_var))
        };

        let providers = self.providers.as_ref();
        let mut retry = RetryConfig::default();
        if let Some(max_retries) = providers.and_then(|p| p.max_retries) {
            retry.max_retries = max_retries;
        }

        ProviderSettings {
            openai_api_key: key(keys.and_then(|k| k.openai.as_ref()), "OPENAI_API_KEY"),
            anthropic_api_key: key(keys.and_then(|k| k.anthropic.as_ref()), "ANTHROPIC_API_KEY"),
            openai_base_url: providers
                .and_then(|p| p.openai_base_url.clone())
                .unwrap_or_else(|| OPENAI_API_BASE_URL.to_string()),
            anthropic_base_url: providers
                .and_then(|p| p.anthropic_base_url.clone())
                .unwrap_or_else(|| ANTHROPIC_API_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(
                providers
                    .and_then(|p| p.timeout_seconds)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            retry,
        }
    }

    /// Audit root directory, or `None` when auditing is disabled.
    #[must_use]
    pub fn audit_dir(&self) -> Option<PathBuf> {
        let audit = self.audit.as_ref();
        if !audit.is_none_or(|audit| audit.enabled) {
            return None;
        }
        match audit.and_then(|audit| audit.dir.as_deref()) {
            Some(dir) => Some(expand_home(dir)),
            None => chronicle_dir().map(|dir| dir.join("audit")),
        }
    }
}

/// `~/.chronicle`, the directory for config, logs and audit records.
#[must_use]
pub fn chronicle_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".chronicle"))
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    chronicle_dir().map(|dir| dir.join("config.toml"))
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map_or_else(|| PathBuf::from(path), |home| home.join(rest)),
        None => PathBuf::from(path),
    }
}
