use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{http_client, post_json, TEMPERATURE};
use crate::config::LlmConfig;
use crate::llm::{CompletionProvider, LlmError};

const SYSTEM_PROMPT: &str = "You are an expert QA and test automation consultant.";

/// OpenAI-style chat completions.
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
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
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens,
            temperature: TEMPERATURE,
        };

        let request = self.client.post(&self.endpoint).bearer_auth(&self.api_key);
        let response: ChatResponse = post_json(request, &body).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::Empty { provider: "openai" })
    }
}
