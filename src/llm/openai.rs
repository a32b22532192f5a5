//! Chat-completions client for the text-generation capability
//!
//! Uses a long-lived reqwest::Client for connection pooling. Every call is
//! bounded by the configured generation timeout.

use crate::config::AppConfig;
use crate::error::OrchestrationError;
use crate::llm::TextGenerator;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

/// Reusable chat client (connection-pooled)
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(config.generation_timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            endpoint: format!("{}/chat/completions", config.openai_base_url),
            model: config.chat_model.clone(),
        })
    }

    fn build_request<'a>(&'a self, system_context: &'a str, user_prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_context,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.0,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, system_context: &str, user_prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(OrchestrationError::ConfigError(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }

        let request = self.build_request(system_context, user_prompt);

        info!(model = %self.model, "Calling generation service");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Generation request failed: {}", e);
                OrchestrationError::TransportError(format!("generation request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Generation service error response: {}", error_text);
            return Err(OrchestrationError::TransportError(format!(
                "generation service returned {}",
                status
            )));
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse generation response: {}", e);
            OrchestrationError::DecodeError(format!("generation response: {}", e))
        })?;

        let text = first_completion(completion)?;
        debug!(raw = %text, "Generation output");

        Ok(text)
    }
}

fn first_completion(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| OrchestrationError::DecodeError("no usable completion returned".to_string()))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}
