//! Result Summarizer
//!
//! Feeds the raw records back through the generation service for a short
//! explanation, chart hint and image prompt, then renders the image when a
//! prompt came back. Nothing here fails the request: the records are already
//! in hand, so a degraded summary beats no answer.

use crate::fence::extract_fenced_json;
use crate::llm::{ImageGenerator, TextGenerator};
use crate::models::{ChartKind, ImageArtifact, QueryResult, SummaryMeta};
use crate::prompts::{SCHEMA_CONTEXT, SUMMARY_PROMPT};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Summary metadata plus the rendered image, if any
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub meta: SummaryMeta,
    pub image: ImageArtifact,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SummaryPayload {
    summary: Option<Value>,
    chart: Option<Value>,
    image_prompt: Option<Value>,
    video_prompt: Option<Value>,
}

pub struct ResultSummarizer {
    generator: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageGenerator>,
}

impl ResultSummarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, images: Arc<dyn ImageGenerator>) -> Self {
        Self { generator, images }
    }

    pub async fn summarize(&self, results: &QueryResult) -> Summary {
        let meta = self.describe(results).await;
        let image = self.illustrate(&meta).await;
        Summary { meta, image }
    }

    async fn describe(&self, results: &QueryResult) -> SummaryMeta {
        let rendered = match serde_json::to_string(results) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!("Could not render results for summary: {}", e);
                return SummaryMeta::default();
            }
        };
        let prompt = format!("{}{}", SUMMARY_PROMPT, rendered);

        match self.generator.generate(SCHEMA_CONTEXT, &prompt).await {
            Ok(raw) => {
                let meta = decode_summary(&raw);
                info!(
                    chart = meta.chart.map(|c| c.as_str()).unwrap_or(""),
                    has_image_prompt = !meta.image_prompt.is_empty(),
                    "Summary decoded"
                );
                debug!(summary = %meta.summary, "Summary text");
                meta
            }
            Err(e) => {
                warn!("Summary generation failed: {}", e);
                SummaryMeta::default()
            }
        }
    }

    async fn illustrate(&self, meta: &SummaryMeta) -> ImageArtifact {
        if meta.image_prompt.is_empty() {
            return ImageArtifact::none();
        }

        match self.images.generate_image(&meta.image_prompt).await {
            Ok(Some(payload)) => ImageArtifact::from_base64(payload),
            Ok(None) => {
                warn!("Image service returned no image data");
                ImageArtifact::none()
            }
            Err(e) => {
                warn!("Image generation failed: {}", e);
                ImageArtifact::none()
            }
        }
    }
}

/// Fenced summary JSON → metadata. Each field falls back to empty on its
/// own; an unreadable payload yields all-empty metadata.
pub fn decode_summary(raw: &str) -> SummaryMeta {
    let payload = extract_fenced_json(raw);
    if payload.is_empty() {
        return SummaryMeta::default();
    }

    let decoded: SummaryPayload = match serde_json::from_str(&payload) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Summary payload did not decode: {}", e);
            return SummaryMeta::default();
        }
    };

    SummaryMeta {
        summary: text_field(decoded.summary),
        chart: ChartKind::parse(&text_field(decoded.chart)),
        image_prompt: text_field(decoded.image_prompt),
        video_prompt: Some(text_field(decoded.video_prompt)).filter(|v| !v.is_empty()),
    }
}

fn text_field(value: Option<Value>) -> String {
    match value {
        Some(Value::String(text)) => text.trim().to_string(),
        _ => String::new(),
    }
}
