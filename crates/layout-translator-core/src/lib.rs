//! Layout Translator Core Library
//!
//! This library provides the core functionality for translating PDF documents
//! while keeping their visual layout:
//! - File intake (PDF only)
//! - Page rasterization for the original-document preview
//! - Streaming translation through Google Gemini
//! - Post-processing and constrained rendering of the returned markup
//! - The per-session controller and its status state machine

pub mod config;
pub mod error;
pub mod export;
pub mod intake;
pub mod markup;
pub mod pdf;
pub mod session;
pub mod translator;
pub mod util;

pub use config::{
    AppConfig, GeminiConfig, Lang, LanguageOption, DEFAULT_TARGET_LANG, language_by_code,
    supported_languages,
};
pub use error::{Error, Result};
pub use export::PrintDocument;
pub use intake::{IncomingFile, SelectedFile};
pub use pdf::{ImageFormat, PageRenderer, PdfDocument, RenderedDocument, render_document};
pub use session::{
    PreviewHandle, PreviewRegistry, RunOutcome, SessionController, TranslationRun,
    TranslationState, TranslationStatus, drive_translation,
};
pub use translator::{
    GenerativeModel, TranslationClient, TranslationEvent, create_model,
};

/// Build a translation client for the configured backend.
pub fn client_from_config(config: &AppConfig) -> Result<TranslationClient> {
    let model = create_model(&config.gemini)?;
    Ok(TranslationClient::new(model))
}

/// Render every page of `bytes` at `scale`, skipping pages that fail.
pub fn render_preview(bytes: &[u8], scale: f32, format: ImageFormat) -> Result<RenderedDocument> {
    let doc = PdfDocument::from_bytes(bytes)?;
    tracing::debug!(
        "Rendering {} pages of {}",
        doc.page_count(),
        doc.title().unwrap_or("untitled document")
    );
    let renderer = PageRenderer::with_scale(&doc, scale);
    Ok(render_document(&renderer, format))
}
