mod client;
mod gemini;
mod prompt;
mod traits;

pub use client::{
    STATUS_CONNECTING, STATUS_PROCESSING, STATUS_TRANSLATING, TranslationClient,
    TranslationEvent, TranslationStream,
};
pub use gemini::GeminiModel;
pub use prompt::{FIGURE_PLACEHOLDER, build_prompt};
pub use traits::{GenerationRequest, GenerativeModel, ModelInfo, TextStream};

use crate::config::GeminiConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create the generative backend from configuration
pub fn create_model(config: &GeminiConfig) -> Result<Arc<dyn GenerativeModel>> {
    let model = GeminiModel::new(config)?;
    Ok(Arc::new(model))
}
