//! Askama templates for htmx responses.
//!
//! ## Template Structure
//!
//! - `base.html` - Common layout with CSS/JS
//! - `index.html` - Landing page with the upload area
//! - `app.html` - Session page: controls, error banner, dual pane
//! - `partials/` - Pieces shared between full pages and fragments
//!
//! While a translation runs, `partials/stream_sink.html` holds the SSE
//! connection. Each pushed `update` event carries out-of-band swaps for the
//! controls, the banner and the translated pane (`partials/update.html`).

use askama::Template;
use askama_web::WebTemplate;
use layout_translator_core::{
    LanguageOption, TranslationState, export::SUGGESTED_FILE_NAME, markup::render_translation,
    supported_languages,
};

use crate::preview_store::PageSet;

/// Everything the session page shows, taken from one state snapshot.
pub struct WorkspaceView {
    pub session_id: String,
    pub has_file: bool,
    pub file_name: String,
    pub file_size: String,
    pub oversized: bool,
    pub languages: &'static [LanguageOption],
    pub selected: &'static LanguageOption,
    pub status: &'static str,
    pub is_translating: bool,
    pub error: Option<String>,
    pub status_message: String,
    /// Sanitized translation markup
    pub translated_html: Option<String>,
    pub can_export: bool,
    pub export_file_name: &'static str,
}

impl WorkspaceView {
    pub fn new(session_id: &str, state: &TranslationState, soft_limit_bytes: u64) -> Self {
        let (file_name, file_size, oversized) = state.file.as_ref().map_or_else(
            || (String::new(), String::new(), false),
            |f| (f.name.clone(), f.display_size(), f.exceeds_soft_limit(soft_limit_bytes)),
        );

        Self {
            session_id: session_id.to_string(),
            has_file: state.has_file(),
            file_name,
            file_size,
            oversized,
            languages: supported_languages(),
            selected: state.target_language,
            status: state.status.label(),
            is_translating: state.is_translating(),
            error: state.error.clone(),
            status_message: state.status_message.clone(),
            translated_html: state
                .translated_content
                .as_deref()
                .filter(|c| !c.is_empty())
                .map(render_translation),
            can_export: state.can_export(),
            export_file_name: SUGGESTED_FILE_NAME,
        }
    }
}

// =============================================================================
// Full Page Templates
// =============================================================================

/// Landing page with upload form.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub upload_url: String,
    pub soft_limit_mb: u64,
}

/// Session page.
#[derive(Template, WebTemplate)]
#[template(path = "app.html")]
pub struct AppTemplate {
    pub view: WorkspaceView,
    pub upload_url: String,
    pub soft_limit_mb: u64,
    pub oob: bool,
}

impl AppTemplate {
    pub fn new(view: WorkspaceView, soft_limit_mb: u64) -> Self {
        Self {
            upload_url: format!("/api/upload/{}", view.session_id),
            view,
            soft_limit_mb,
            oob: false,
        }
    }
}

// =============================================================================
// Fragment Templates (htmx partial responses)
// =============================================================================

/// Controls bar (file info, language dropdown, translate button).
#[derive(Template, WebTemplate)]
#[template(path = "partials/controls.html")]
pub struct ControlsTemplate {
    pub view: WorkspaceView,
    pub oob: bool,
}

/// Error banner; empty once dismissed.
#[derive(Template, WebTemplate)]
#[template(path = "partials/banner.html")]
pub struct BannerTemplate {
    pub view: WorkspaceView,
    pub oob: bool,
}

/// Out-of-band refresh of everything a translation run changes.
#[derive(Template, WebTemplate)]
#[template(path = "partials/update.html")]
pub struct UpdateTemplate {
    pub view: WorkspaceView,
    pub oob: bool,
}

impl UpdateTemplate {
    pub const fn new(view: WorkspaceView) -> Self {
        Self { view, oob: true }
    }
}

/// Response to the translate button: SSE sink plus an immediate refresh.
#[derive(Template, WebTemplate)]
#[template(path = "partials/started.html")]
pub struct StartedTemplate {
    pub view: WorkspaceView,
    pub oob: bool,
}

impl StartedTemplate {
    pub const fn new(view: WorkspaceView) -> Self {
        Self { view, oob: true }
    }
}

/// One rendered page in the original pane
pub struct PageImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Original document pane, rendered once per preview.
#[derive(Template, WebTemplate)]
#[template(path = "partials/original_pane.html")]
pub struct OriginalPaneTemplate {
    pub page_count: usize,
    pub pages: Vec<PageImage>,
    pub error: Option<String>,
}

impl OriginalPaneTemplate {
    pub fn from_pages(preview_id: &str, set: &PageSet) -> Self {
        Self {
            page_count: set.total,
            pages: set
                .pages
                .iter()
                .map(|p| PageImage {
                    url: format!("/preview/{preview_id}/{}", p.page),
                    width: p.width,
                    height: p.height,
                })
                .collect(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            page_count: 0,
            pages: Vec::new(),
            error: Some(message.into()),
        }
    }
}
