use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;

/// Ordered text fragments from a streaming generation call.
///
/// Finite and non-restartable; dropping it abandons the request.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Information about a generative backend
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Human-readable backend name
    pub name: &'static str,
    /// Model identifier sent with each request
    pub model: String,
}

/// One document + instruction generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Media type of the attached payload, e.g. `application/pdf`
    pub media_type: String,
    /// Base64 of the payload bytes
    pub data_base64: String,
    pub prompt: String,
}

/// A generative AI service that streams its answer.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn info(&self) -> ModelInfo;

    /// Whether a credential is available. Checked before any request is made.
    fn is_configured(&self) -> bool {
        true
    }

    /// Open a streaming generation request.
    async fn stream_generate(&self, request: GenerationRequest) -> Result<TextStream>;
}
