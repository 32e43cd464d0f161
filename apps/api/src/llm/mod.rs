//! LLM client — the single point of entry for all model calls in Prospect.
//!
//! All completions go through the Yandex Foundation Models HTTP API. No
//! other module may talk to the model endpoint directly.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const COMPLETION_URL: &str = "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";
const MAX_TOKENS: u32 = 2000;
const MAX_RETRIES: u32 = 3;

/// Temperature for free-text generation (cover letter).
pub const COVER_LETTER_TEMPERATURE: f32 = 0.5;
/// Temperature for structured extraction; lower variance improves
/// JSON-parseability of the output.
pub const ANALYSIS_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged message of an ordered prompt. A system message, if
/// present, must precede the user messages.
#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    pub role: Role,
    pub text: String,
}

impl PromptMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }
}

/// Seam for the completion call so the pipeline and scheduler can be
/// exercised against a stub backend in tests.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Sends an ordered message list to the model and returns the raw text
    /// of the first candidate, or an empty string if the model returned no
    /// candidates. Empty output is not an error.
    async fn complete(
        &self,
        messages: &[PromptMessage],
        temperature: f32,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_uri: &'a str,
    completion_options: CompletionOptions,
    messages: &'a [PromptMessage],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    stream: bool,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Debug, Deserialize)]
struct CompletionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    message: AlternativeMessage,
}

#[derive(Debug, Deserialize)]
struct AlternativeMessage {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// The single LLM client used by the whole service. Wraps the completion
/// endpoint with retry logic and a bounded request timeout.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model_uri: String,
}

impl LlmClient {
    pub fn new(api_key: String, folder_id: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            model_uri: format!("gpt://{folder_id}/yandexgpt/latest"),
        }
    }

    pub fn model_uri(&self) -> &str {
        &self.model_uri
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    /// Makes a raw completion call.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn complete(
        &self,
        messages: &[PromptMessage],
        temperature: f32,
    ) -> Result<String, LlmError> {
        let request_body = CompletionRequest {
            model_uri: &self.model_uri,
            completion_options: CompletionOptions {
                stream: false,
                temperature,
                max_tokens: MAX_TOKENS,
            },
            messages,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(COMPLETION_URL)
                .header("Authorization", format!("Api-Key {}", self.api_key))
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                // Try to parse error message
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let completion: CompletionResponse = response.json().await?;

            let text = completion
                .result
                .alternatives
                .into_iter()
                .next()
                .map(|a| a.message.text)
                .unwrap_or_default();

            debug!("LLM call succeeded: {} chars returned", text.len());

            return Ok(text);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_uri_interpolates_folder() {
        let client = LlmClient::new("key".to_string(), "b1gexample");
        assert_eq!(client.model_uri(), "gpt://b1gexample/yandexgpt/latest");
    }

    #[test]
    fn test_prompt_message_roles_serialize_lowercase() {
        let system = serde_json::to_value(PromptMessage::system("s")).unwrap();
        let user = serde_json::to_value(PromptMessage::user("u")).unwrap();
        assert_eq!(system["role"], "system");
        assert_eq!(user["role"], "user");
    }
}
