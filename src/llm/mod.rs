//! Generation and image capabilities
//!
//! Both are opaque remote services. The rest of the crate only sees the
//! traits below, so the HTTP clients can be swapped for scripted doubles.

use crate::Result;
use async_trait::async_trait;

pub mod image;
pub mod openai;

pub use image::{DisabledImageGenerator, OpenAiImageClient};
pub use openai::OpenAiClient;

/// Text-generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Single deterministic completion for `user_prompt` under `system_context`.
    /// No retries; any failure is returned to the caller.
    async fn generate(&self, system_context: &str, user_prompt: &str) -> Result<String>;
}

/// Image-generation capability
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Base64 image for `prompt`, or `None` when the service returned no image.
    async fn generate_image(&self, prompt: &str) -> Result<Option<String>>;
}
