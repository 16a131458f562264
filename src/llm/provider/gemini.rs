use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{http_client, post_json, TEMPERATURE};
use crate::config::LlmConfig;
use crate::llm::{CompletionProvider, LlmError};

/// Headroom for the model's internal reasoning tokens.
const THINKING_BUFFER: u32 = 500;

/// Google Gemini `generateContent`.
///
/// The model goes in the path and the key in the `x-goog-api-key` header.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiProvider {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(cfg.timeout())?,
            base_url: cfg.endpoint(),
            model: cfg.model_id(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait::async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens + THINKING_BUFFER,
                temperature: TEMPERATURE,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key);
        let response: GenerateResponse = post_json(request, &body).await?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or(LlmError::Empty { provider: "gemini" })
    }
}
