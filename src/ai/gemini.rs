use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::AiConfig;
use crate::error::{Result, ProntuError};
use super::{GenerativeClient, GenerativePart};

#[derive(Debug, Clone, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Clone, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Clone, Serialize)]
struct RequestPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize)]
struct InlineData {
    #[serde(rename = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Client for the Gemini generateContent REST API
pub struct GeminiClient {
    client: Client,
    config: AiConfig,
}

impl GeminiClient {
    pub fn new(config: AiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("HTTP client creation should not fail");

        Self { client, config }
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        parts: Vec<GenerativePart>,
    ) -> Result<String> {
        let request_parts = parts
            .into_iter()
            .map(|part| match part {
                GenerativePart::Text(text) => RequestPart {
                    text: Some(text),
                    inline_data: None,
                },
                GenerativePart::Audio { mime_type, data } => RequestPart {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type,
                        data: BASE64.encode(data),
                    }),
                },
            })
            .collect();

        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: request_parts,
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint, model
        );

        debug!("Sending generateContent request to model {}", model);

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProntuError::RemoteApi(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProntuError::RemoteApi(format!(
                "Generative API error {}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response.json().await
            .map_err(|e| ProntuError::RemoteApi(format!("Failed to parse response: {}", e)))?;

        let text = body
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(ProntuError::RemoteApi(
                "Generative API returned no text candidates".to_string(),
            ));
        }

        Ok(text)
    }
}
