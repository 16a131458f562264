use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{http_client, post_json, TEMPERATURE};
use crate::config::LlmConfig;
use crate::llm::{CompletionProvider, LlmError};

/// Local inference server speaking the Ollama `/api/generate` protocol
/// (Ollama, LM Studio and friends).
pub struct LocalProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl LocalProvider {
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
impl CompletionProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: max_tokens,
                temperature: TEMPERATURE,
            },
        };

        let mut request = self.client.post(&self.endpoint);
        // Proxied local servers sometimes sit behind a token.
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response: GenerateResponse = post_json(request, &body).await?;

        if response.response.is_empty() {
            return Err(LlmError::Empty { provider: "local" });
        }
        Ok(response.response)
    }
}
