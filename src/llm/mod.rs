//! Optional LLM augmentation.
//!
//! A configured provider is an `Arc<dyn CompletionProvider>`; a disabled layer
//! is simply `None`. Every caller owns a deterministic fallback and must take
//! it on `None` or on any [`LlmError`].

pub mod prompt;
pub mod provider;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::config::{LlmConfig, ProviderKind};

pub use prompt::{FixContext, SummaryFacts};
pub use provider::{ClaudeProvider, GeminiProvider, LocalProvider, OpenAiProvider};

/// Token budget for a fix suggestion.
pub const FIX_MAX_TOKENS: u32 = 500;
/// Token budget for an executive narrative.
pub const SUMMARY_MAX_TOKENS: u32 = 300;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} requires an API key")]
    MissingApiKey { provider: ProviderKind },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("no answer within {0:?}")]
    Timeout(Duration),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response body: {0}")]
    Malformed(String),

    #[error("empty response from {provider}")]
    Empty { provider: &'static str },
}

/// A text-generation backend.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider id, used in logs.
    fn name(&self) -> &'static str;

    /// Complete `prompt`, generating at most roughly `max_tokens` tokens.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}

/// Build the configured provider, or `None` when augmentation is off.
pub fn build_provider(cfg: &LlmConfig) -> Result<Option<Arc<dyn CompletionProvider>>, LlmError> {
    if !cfg.is_active() {
        debug!("LLM augmentation disabled");
        return Ok(None);
    }
    if cfg.provider.requires_api_key() && cfg.api_key.trim().is_empty() {
        return Err(LlmError::MissingApiKey {
            provider: cfg.provider,
        });
    }

    let provider: Arc<dyn CompletionProvider> = match cfg.provider {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_config(cfg)?),
        ProviderKind::Claude => Arc::new(ClaudeProvider::from_config(cfg)?),
        ProviderKind::Gemini => Arc::new(GeminiProvider::from_config(cfg)?),
        ProviderKind::Local => Arc::new(LocalProvider::from_config(cfg)?),
        ProviderKind::None => return Ok(None),
    };
    Ok(Some(provider))
}

/// Run one completion under a hard deadline and reject blank answers.
pub async fn complete_within(
    provider: &dyn CompletionProvider,
    prompt: &str,
    max_tokens: u32,
    limit: Duration,
) -> Result<String, LlmError> {
    let text = tokio::time::timeout(limit, provider.complete(prompt, max_tokens))
        .await
        .map_err(|_| LlmError::Timeout(limit))??;
    let text = text.trim();
    if text.is_empty() {
        return Err(LlmError::Empty {
            provider: provider.name(),
        });
    }
    Ok(text.to_string())
}

/// Ask for a root cause and fix for one failure.
pub async fn suggest_fix(
    provider: &dyn CompletionProvider,
    ctx: &FixContext<'_>,
    limit: Duration,
) -> Result<String, LlmError> {
    let prompt = prompt::fix_suggestion(ctx);
    complete_within(provider, &prompt, FIX_MAX_TOKENS, limit).await
}

/// Ask for a short business-level summary of the run.
pub async fn narrate_summary(
    provider: &dyn CompletionProvider,
    facts: &SummaryFacts,
    limit: Duration,
) -> Result<String, LlmError> {
    let prompt = prompt::executive_summary(facts);
    complete_within(provider, &prompt, SUMMARY_MAX_TOKENS, limit).await
}
