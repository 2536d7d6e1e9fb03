use serde::Serialize;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, AppError};

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

/// Everything one vision critique call needs.
pub struct VisionPrompt<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub image_data_url: String,
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build LLM client: {}", e)))?;
        Ok(LlmClient {
            http,
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a system + image prompt and returns the raw message content.
    pub async fn critique(&self, prompt: VisionPrompt<'_>) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: vec![ContentPart::Text { text: prompt.system.to_string() }],
                },
                Message {
                    role: "user",
                    content: vec![
                        ContentPart::Text { text: prompt.user.to_string() },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl { url: prompt.image_data_url },
                        },
                    ],
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        };

        let url = format!("{}/chat/completions", self.base_url);
        info!(model = %self.model, "calling vision model");
        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "AI provider request failed");
                if e.is_connect() || e.is_timeout() {
                    AppError::LlmUnavailable
                } else {
                    AppError::LlmError(e.to_string())
                }
            })?;

        let status = res.status();
        if status.as_u16() == 429 {
            warn!("AI provider rate limited the request");
            return Err(AppError::RateLimited);
        }
        if !status.is_success() {
            let upstream: Option<serde_json::Value> = res.json().await.ok();
            let message = upstream
                .as_ref()
                .and_then(|v| v["error"]["message"].as_str())
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            warn!(status = status.as_u16(), %message, "AI provider returned an error");
            return Err(AppError::Upstream { status: status.as_u16(), message });
        }

        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| AppError::LlmError(e.to_string()))?;
        let reply = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AppError::LlmError("Invalid response format from LLM".to_string()))?
            .to_string();

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_chat_completions_shape() {
        let body = ChatRequest {
            model: "m",
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentPart::Text { text: "look".into() },
                    ContentPart::ImageUrl { image_url: ImageUrl { url: "data:x".into() } },
                ],
            }],
            response_format: ResponseFormat { kind: "json_object" },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "m",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "look"},
                        {"type": "image_url", "image_url": {"url": "data:x"}}
                    ]
                }],
                "response_format": {"type": "json_object"}
            })
        );
    }
}
