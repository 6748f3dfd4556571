use super::{truncate_text, BackendKind, GenerativeTextBackend};
use crate::config::BackendEndpoint;
use crate::prompt::PromptPayload;
use crate::{CritiqueError, CritiqueResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// OpenAI-compatible chat completions client.
pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: BackendEndpoint,
    api_key: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiBackend {
    pub fn new(
        client: reqwest::Client,
        endpoint: BackendEndpoint,
        api_key: String,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            temperature,
        }
    }

    fn request_body(&self, prompt: &PromptPayload) -> serde_json::Value {
        json!({
            "model": self.endpoint.model,
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ]
        })
    }
}

#[async_trait]
impl GenerativeTextBackend for OpenAiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenAi
    }

    async fn complete(&self, prompt: &PromptPayload) -> CritiqueResult<String> {
        let url = format!(
            "{}/chat/completions",
            self.endpoint.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| CritiqueError::Backend(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CritiqueError::Backend(format!(
                "OpenAI API request failed: HTTP {} {}",
                status,
                truncate_text(&body, 300)
            )));
        }

        let parsed: ChatCompletionsResponse = response.json().await.map_err(|e| {
            CritiqueError::Backend(format!("failed to decode chat completions response: {}", e))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}
