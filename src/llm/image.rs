//! Image-generation client

use crate::config::AppConfig;
use crate::error::OrchestrationError;
use crate::llm::ImageGenerator;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

pub struct OpenAiImageClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    size: String,
}

impl OpenAiImageClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .timeout(config.image_timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            endpoint: format!("{}/images/generations", config.openai_base_url),
            model: config.image_model.clone(),
            size: config.image_size.clone(),
        })
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageClient {
    async fn generate_image(&self, prompt: &str) -> Result<Option<String>> {
        if prompt.is_empty() {
            return Ok(None);
        }
        if self.api_key.is_empty() {
            return Err(OrchestrationError::ConfigError(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }

        let request = ImageRequest {
            model: &self.model,
            prompt,
            size: &self.size,
        };

        info!(model = %self.model, "Calling image service");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| OrchestrationError::TransportError(format!("image request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, "Image service error response: {}", error_text);
            return Err(OrchestrationError::TransportError(format!(
                "image service returned {}",
                status
            )));
        }

        let body: ImageResponse = response
            .json()
            .await
            .map_err(|e| OrchestrationError::DecodeError(format!("image response: {}", e)))?;

        Ok(first_payload(body))
    }
}

fn first_payload(body: ImageResponse) -> Option<String> {
    body.data?
        .into_iter()
        .next()
        .and_then(|item| item.b64_json)
        .filter(|payload| !payload.is_empty())
}

/// Used when image generation is switched off in configuration
pub struct DisabledImageGenerator;

#[async_trait]
impl ImageGenerator for DisabledImageGenerator {
    async fn generate_image(&self, _prompt: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Option<Vec<ImageData>>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}
