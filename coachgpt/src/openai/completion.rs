use async_trait::async_trait;
use miette::{miette, Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};

use super::Client;

const COACHING_TEMPERATURE: f32 = 0.7;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: Option<String>,
}

impl Message {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.to_string()),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u8>,
}

impl CompletionRequest {
    /// A role-primed analysis request: the system prompt followed by one user message.
    pub fn coaching(model: &str, system_prompt: &str, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![Message::system(system_prompt), Message::user(prompt)],
            temperature: Some(COACHING_TEMPERATURE),
            n: Some(1),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CompletionChoice {
    #[serde(default)]
    pub finish_reason: Option<String>,
    pub index: i64,
    pub message: Message,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CompletionUsage {
    pub completion_tokens: i64,
    pub prompt_tokens: i64,
    pub total_tokens: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub usage: Option<CompletionUsage>,
}

/// Anything that can answer a chat-completion request with the text of its first choice.
#[async_trait]
pub trait Completer: Send + Sync {
    /// The model name requests should carry.
    fn model(&self) -> &str;

    /// `Ok(None)` means the model answered with null content.
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>>;
}

impl Client {
    pub async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let started = std::time::Instant::now();

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request)
            .send()
            .await
            .into_diagnostic()
            .wrap_err("Completion request failed")?
            .error_for_status()
            .into_diagnostic()
            .wrap_err("Completion API returned an error status")?;

        let response_body = response
            .json::<CompletionResponse>()
            .await
            .into_diagnostic()
            .wrap_err("Could not decode completion response")?;

        tracing::debug!(elapsed = ?started.elapsed(), model = %response_body.model, "completion finished");

        Ok(response_body)
    }
}

#[async_trait]
impl Completer for Client {
    fn model(&self) -> &str {
        Client::model(self)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>> {
        let answer = self.completion(request).await?;

        let first_choice = answer
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| miette!("Completion response had no choices"))?;

        Ok(first_choice.message.content)
    }
}
