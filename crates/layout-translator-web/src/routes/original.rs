//! Original document routes - page rasters of the current preview.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::Response,
};
use layout_translator_core::{ImageFormat, render_preview};
use std::sync::Arc;
use tracing::{error, warn};

use crate::helpers::{OptionExt, ResultExt, RouteResult, accepts_webp};
use crate::preview_store::write_pages;
use crate::state::AppState;
use crate::templates::OriginalPaneTemplate;

const PREVIEW_FAILED: &str = "Could not load PDF preview.";

/// Original pane - renders every page of the session's preview once.
///
/// Rendering runs in a blocking task; later requests reuse the pages on disk.
pub async fn original_pane(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> RouteResult<OriginalPaneTemplate> {
    let session_ref = state
        .get_session(&session_id)
        .await
        .or_not_found("Session not found")?;

    let preview = session_ref
        .with_session(|s| s.controller.state().preview.clone())
        .await
        .or_not_found("Session not found")?
        .or_not_found("No document selected")?;

    if let Some(set) = state.previews.page_set(&preview.id) {
        return Ok(OriginalPaneTemplate::from_pages(&preview.id, &set));
    }

    let (bytes, dir) = state
        .previews
        .source(&preview.id)
        .or_not_found("Preview revoked")?;

    let format = if accepts_webp(&headers) {
        ImageFormat::Webp
    } else {
        ImageFormat::Png
    };
    let scale = state.config.render_scale;

    let rendered = tokio::task::spawn_blocking(move || {
        let rendered = render_preview(&bytes, scale, format)?;
        Ok::<_, anyhow::Error>(write_pages(&dir, &rendered, format)?)
    })
    .await
    .map_err(|e| {
        error!("Render task panicked: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Render task failed".to_string())
    })?;

    let set = match rendered {
        Ok(set) => set,
        Err(e) => {
            warn!("Preview {} failed to render: {}", preview.id, e);
            return Ok(OriginalPaneTemplate::failed(PREVIEW_FAILED));
        }
    };

    if !state.previews.mark_rendered(&preview.id, set.clone()) {
        return Err((StatusCode::NOT_FOUND, "Preview revoked".to_string()));
    }
    Ok(OriginalPaneTemplate::from_pages(&preview.id, &set))
}

/// One rendered page. Answers 404 once the preview is revoked.
pub async fn preview_page(
    State(state): State<Arc<AppState>>,
    Path((preview_id, page)): Path<(String, usize)>,
) -> RouteResult<Response> {
    let (path, format) = state
        .previews
        .page_file(&preview_id, page)
        .or_not_found("Page not found")?;

    let data = tokio::fs::read(&path)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "Page not found".to_string()))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(Body::from(data))
        .or_internal_error()
}
