//! Export route - print-ready translated document.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use layout_translator_core::PrintDocument;
use layout_translator_core::export::DEFAULT_TITLE;
use std::sync::Arc;

use crate::helpers::{OptionExt, ResultExt, RouteResult};
use crate::state::AppState;

/// Standalone page with the translation that opens the print dialog.
///
/// Used when client-side PDF export is unavailable.
pub async fn export_document(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> RouteResult<Response> {
    let session_ref = state
        .get_session(&session_id)
        .await
        .or_not_found("Session not found")?;

    let markup = session_ref
        .with_session(|s| {
            let current = s.controller.state();
            current
                .can_export()
                .then(|| current.translated_content.clone().unwrap_or_default())
        })
        .await
        .or_not_found("Session not found")?;

    let Some(markup) = markup else {
        return Err((StatusCode::BAD_REQUEST, "Nothing translated yet".to_string()));
    };

    let html = PrintDocument::from_translation(DEFAULT_TITLE, &markup)
        .to_html()
        .or_internal_error()?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Body::from(html))
        .or_internal_error()
}
