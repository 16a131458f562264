use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{http_client, post_json};
use crate::config::LlmConfig;
use crate::llm::{CompletionProvider, LlmError};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic messages API.
pub struct ClaudeProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl ClaudeProvider {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(cfg.timeout())?,
            endpoint: cfg.endpoint(),
            model: cfg.model_id(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ClaudeProvider {
    fn name(&self) -> &'static str {
        "claude"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let request = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let response: MessagesResponse = post_json(request, &body).await?;

        // Skip non-text blocks; the first text block carries the answer.
        response
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or(LlmError::Empty { provider: "claude" })
    }
}
