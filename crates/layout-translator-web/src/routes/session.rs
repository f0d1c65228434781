//! Session lifecycle routes - reset and banner dismissal.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
};
use std::sync::Arc;
use tracing::info;

use crate::helpers::{OptionExt, RouteResult, redirect};
use crate::state::AppState;
use crate::templates::{BannerTemplate, WorkspaceView};

/// Remove the file and start over. A running translation is abandoned.
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> RouteResult<Response> {
    let session_ref = state
        .get_session(&session_id)
        .await
        .or_not_found("Session not found")?;

    session_ref
        .with_session_mut(|s| s.controller.reset())
        .await
        .or_not_found("Session not found")?;
    info!("Reset session {}", session_id);

    redirect(&headers, &format!("/view/{session_id}"))
}

/// Hide the error banner.
pub async fn dismiss_error(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> RouteResult<BannerTemplate> {
    let session_ref = state
        .get_session(&session_id)
        .await
        .or_not_found("Session not found")?;

    let soft_limit = state.config.upload_soft_limit_bytes();
    let view = session_ref
        .with_session_mut(|s| {
            s.controller.dismiss_error();
            WorkspaceView::new(&session_id, s.controller.state(), soft_limit)
        })
        .await
        .or_not_found("Session not found")?;

    Ok(BannerTemplate { view, oob: false })
}
