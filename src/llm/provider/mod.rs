//! Provider variants, one per supported API shape.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::LlmError;

pub mod claude;
pub mod gemini;
pub mod local;
pub mod openai;

pub use claude::ClaudeProvider;
pub use gemini::GeminiProvider;
pub use local::LocalProvider;
pub use openai::OpenAiProvider;

/// Longest error body kept in an [`LlmError::Status`].
const MAX_ERROR_BODY: usize = 512;

pub(crate) const TEMPERATURE: f64 = 0.7;

/// One client per provider, with the configured request timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Client(e.to_string()))
}

/// Transport errors drop the URL; some endpoints carry credentials in it.
fn transport(e: reqwest::Error) -> LlmError {
    LlmError::Request(e.without_url())
}

/// POST `body` as JSON and decode a 2xx answer into `T`.
pub(crate) async fn post_json<B, T>(request: RequestBuilder, body: &B) -> Result<T, LlmError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = request.json(body).send().await.map_err(transport)?;
    let status = response.status();
    let text = response.text().await.map_err(transport)?;

    if !status.is_success() {
        return Err(LlmError::Status {
            status: status.as_u16(),
            body: text.chars().take(MAX_ERROR_BODY).collect(),
        });
    }

    serde_json::from_str(&text).map_err(|e| LlmError::Malformed(e.to_string()))
}
