use thiserror::Error;

/// Message shown when a translation failure carries no text of its own.
pub const FALLBACK_TRANSLATION_MESSAGE: &str = "Failed to translate document.";

/// Unified error type for layout-translator-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - File intake (wrong media type)
/// - PDF operations (opening, rendering)
/// - Translation operations (credential, request, stream)
/// - Configuration operations (loading, validation)
/// - Export rendering
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Intake Errors
    // ==========================================================================
    /// The selected file is not a PDF
    #[error("{message}")]
    UnsupportedMediaType {
        /// Media type that was declared (or inferred) for the file
        media_type: String,
        /// User-facing rejection text
        message: &'static str,
    },

    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Failed to render a PDF page
    #[error("failed to render page {page}: {reason}")]
    PdfRender { page: usize, reason: String },

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// No API key configured for the generative AI service
    #[error("API Key is missing. Please configure your environment.")]
    MissingApiKey,

    /// The streaming request could not be established
    #[error("{0}")]
    TranslationRequest(String),

    /// The service answered with a non-success status
    #[error("Gemini API error: {status} - {body}")]
    TranslationApi { status: u16, body: String },

    /// The stream terminated abnormally
    #[error("{0}")]
    TranslationStream(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // Export Errors
    // ==========================================================================
    /// The print-ready page could not be rendered
    #[error("failed to render export: {0}")]
    Export(#[from] askama::Error),

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Message suitable for the session error banner.
    ///
    /// Never empty: causes without text fall back to a generic message.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            FALLBACK_TRANSLATION_MESSAGE.to_string()
        } else {
            message
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
