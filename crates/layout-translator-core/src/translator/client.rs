use std::pin::Pin;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use futures::{Stream, StreamExt};
use tracing::{debug, error, info};

use super::prompt::build_prompt;
use super::traits::{GenerationRequest, GenerativeModel, ModelInfo};
use crate::error::{Error, Result};
use crate::intake::SelectedFile;
use crate::markup::strip_fences_streaming;

pub const STATUS_PROCESSING: &str = "Processing file...";
pub const STATUS_CONNECTING: &str = "Initializing Gemini AI stream...";
pub const STATUS_TRANSLATING: &str = "Translating...";

/// Progress reported while a translation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationEvent {
    /// Human-readable progress label
    Status(String),
    /// Cumulative translated markup so far, fences stripped
    Content(String),
}

/// Lazy sequence of translation events; ends after the first error.
pub type TranslationStream = Pin<Box<dyn Stream<Item = Result<TranslationEvent>> + Send>>;

/// Translates documents through an injected [`GenerativeModel`].
#[derive(Clone)]
pub struct TranslationClient {
    model: Arc<dyn GenerativeModel>,
}

impl TranslationClient {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub fn model_info(&self) -> ModelInfo {
        self.model.info()
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_configured()
    }

    /// Start translating `file` into `target_language` (a display name).
    ///
    /// Nothing happens until the stream is polled. A missing credential is
    /// reported as the first item, before any encoding or network work.
    pub fn translate(&self, file: &SelectedFile, target_language: &str) -> TranslationStream {
        let model = Arc::clone(&self.model);
        let name = file.name.clone();
        let media_type = file.media_type.clone();
        let bytes = file.bytes.clone();
        let prompt = build_prompt(target_language);
        let target = target_language.to_string();

        Box::pin(async_stream::stream! {
            if !model.is_configured() {
                yield Err(Error::MissingApiKey);
                return;
            }

            yield Ok(TranslationEvent::Status(STATUS_PROCESSING.to_string()));
            let data_base64 = STANDARD.encode(&bytes);

            yield Ok(TranslationEvent::Status(STATUS_CONNECTING.to_string()));
            info!("Translating {} into {} with {}", name, target, model.info().model);

            let request = GenerationRequest {
                media_type,
                data_base64,
                prompt,
            };
            let mut fragments = match model.stream_generate(request).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    error!("Translation Error: {}", e);
                    yield Err(e);
                    return;
                }
            };

            yield Ok(TranslationEvent::Status(STATUS_TRANSLATING.to_string()));

            let mut accumulated = String::new();
            let mut count = 0usize;
            while let Some(fragment) = fragments.next().await {
                match fragment {
                    Ok(text) if text.is_empty() => {}
                    Ok(text) => {
                        count += 1;
                        accumulated.push_str(&text);
                        yield Ok(TranslationEvent::Content(strip_fences_streaming(&accumulated)));
                    }
                    Err(e) => {
                        error!("Translation Error: {}", e);
                        yield Err(e);
                        return;
                    }
                }
            }

            debug!("Stream for {} finished after {} fragments ({} bytes)", name, count, accumulated.len());
        })
    }
}
