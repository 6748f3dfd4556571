use super::{truncate_text, BackendKind, GenerativeTextBackend};
use crate::config::BackendEndpoint;
use crate::prompt::PromptPayload;
use crate::{CritiqueError, CritiqueResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Google Gemini `generateContent` client.
pub struct GeminiBackend {
    client: reqwest::Client,
    endpoint: BackendEndpoint,
    api_key: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(self) -> String {
        self.candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

impl GeminiBackend {
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
            "systemInstruction": {
                "parts": [{"text": prompt.system}]
            },
            "contents": [
                {"role": "user", "parts": [{"text": prompt.user}]}
            ],
            "generationConfig": {"temperature": self.temperature}
        })
    }
}

#[async_trait]
impl GenerativeTextBackend for GeminiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }

    async fn complete(&self, prompt: &PromptPayload) -> CritiqueResult<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint.base_url.trim_end_matches('/'),
            self.endpoint.model
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                // reqwest errors can echo the URL, which carries the key.
                CritiqueError::Backend(format!("Gemini request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CritiqueError::Backend(format!(
                "Gemini API request failed: HTTP {} {}",
                status,
                truncate_text(&body, 300)
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            CritiqueError::Backend(format!(
                "failed to decode generateContent response: {}",
                e.without_url()
            ))
        })?;

        Ok(parsed.text().trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_joins_parts() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text(), "{\"a\":1}");
    }

    #[test]
    fn test_response_text_empty_when_no_candidates() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.text(), "");
    }

    #[test]
    fn test_request_body_uses_system_instruction() {
        let backend = GeminiBackend::new(
            reqwest::Client::new(),
            BackendEndpoint::default_for(BackendKind::Gemini),
            "key".into(),
            0.3,
        );
        let body = backend.request_body(&PromptPayload {
            system: "sys".into(),
            user: "usr".into(),
        });
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "usr");
    }
}
