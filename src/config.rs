//! TOML configuration for testsight.
//!
//! Every section has compiled-in defaults, so an empty file (or no file at
//! all) yields a working configuration with LLM augmentation switched off.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TESTSIGHT_CONFIG";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntelConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl IntelConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try, in order: `$TESTSIGHT_CONFIG`, `./testsight.toml`, defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "TESTSIGHT_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local_path = Path::new("testsight.toml");
        if local_path.exists() {
            match Self::load(local_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %local_path.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// LLM
// ---------------------------------------------------------------------------

/// Which text-generation backend to call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Claude,
    Gemini,
    Local,
    #[default]
    None,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Local => "local",
            ProviderKind::None => "none",
        }
    }

    /// Cloud providers refuse to run without a key.
    pub fn requires_api_key(&self) -> bool {
        matches!(
            self,
            ProviderKind::OpenAi | ProviderKind::Claude | ProviderKind::Gemini
        )
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1/chat/completions",
            ProviderKind::Claude => "https://api.anthropic.com/v1/messages",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::Local => "http://localhost:11434/api/generate",
            ProviderKind::None => "",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4-turbo-preview",
            ProviderKind::Claude => "claude-3-sonnet-20240229",
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::Local => "llama2",
            ProviderKind::None => "",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LLM augmentation settings. Off unless `enabled` and a provider is chosen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: ProviderKind,
    /// Required for cloud providers, optional for `local`.
    pub api_key: String,
    /// Empty means the provider's default endpoint.
    pub api_url: String,
    /// Empty means the provider's default model.
    pub model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: ProviderKind::None,
            api_key: String::new(),
            api_url: String::new(),
            model: String::new(),
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    pub fn is_active(&self) -> bool {
        self.enabled && self.provider != ProviderKind::None
    }

    pub fn endpoint(&self) -> String {
        if self.api_url.is_empty() {
            self.provider.default_endpoint().to_string()
        } else {
            self.api_url.trim_end_matches('/').to_string()
        }
    }

    pub fn model_id(&self) -> String {
        if self.model.is_empty() {
            self.provider.default_model().to_string()
        } else {
            self.model.clone()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Tunables for the analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub enable_trends: bool,
    /// Days of history feeding the trend series.
    pub trend_window_days: u32,
    pub flaky_detection: bool,
    /// Days of history consulted per scenario.
    pub flaky_window_days: u32,
    /// Scores strictly above this are flagged.
    pub flaky_threshold: f64,
    /// Fewer historical runs than this and a scenario is never flaky.
    pub min_flaky_runs: usize,
    /// Concurrent LLM fix-suggestion requests.
    pub fix_suggestion_workers: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enable_trends: true,
            trend_window_days: 30,
            flaky_detection: true,
            flaky_window_days: 30,
            flaky_threshold: 0.3,
            min_flaky_runs: 3,
            fix_suggestion_workers: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// History database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub enabled: bool,
    pub path: PathBuf,
    /// Prune history older than this after each recorded run.
    pub retention_days: Option<u32>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(".testsight/history.db"),
            retention_days: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
