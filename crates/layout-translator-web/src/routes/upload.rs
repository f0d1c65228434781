//! Upload routes - PDF file selection.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use axum_extra::extract::Multipart;
use layout_translator_core::{IncomingFile, SessionController, intake};
use std::sync::Arc;
use tracing::info;

use crate::helpers::{OptionExt, ResultExt, RouteResult, redirect, status_for};
use crate::state::AppState;

/// Pull the `file` field out of a multipart upload.
async fn read_file(mut multipart: Multipart) -> RouteResult<IncomingFile> {
    while let Some(field) = multipart.next_field().await.or_bad_request()? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("document.pdf").to_string();
        let media_type = field.content_type().map(ToString::to_string);
        let bytes = field.bytes().await.or_bad_request()?;
        return Ok(IncomingFile::new(name, media_type, bytes));
    }

    Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()))
}

/// Validate the file and install it; a rejection keeps the session as it was.
fn select(controller: &mut SessionController, file: IncomingFile, soft_limit: u64) -> RouteResult<()> {
    intake::accept_with_limit(file, soft_limit)
        .and_then(|selected| controller.install_file(selected))
        .map_err(|e| (status_for(&e), e.to_string()))
}

/// Upload into a fresh session - redirects to its view (POST-Redirect-GET).
///
/// Nothing is created when the file is rejected.
pub async fn upload_new(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> RouteResult<Response> {
    let file = read_file(multipart).await?;
    let mut controller = state.new_controller();
    select(&mut controller, file, state.config.upload_soft_limit_bytes())?;

    let session_id = state.insert_session(controller).await;
    info!("Created session {}", session_id);

    redirect(&headers, &format!("/view/{session_id}"))
}

/// Select a new file in an existing session.
pub async fn upload_into(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> RouteResult<Response> {
    let session_ref = state
        .get_session(&session_id)
        .await
        .or_not_found("Session not found")?;

    let file = read_file(multipart).await?;
    let soft_limit = state.config.upload_soft_limit_bytes();
    session_ref
        .with_session_mut(|s| select(&mut s.controller, file, soft_limit))
        .await
        .or_not_found("Session not found")??;

    redirect(&headers, &format!("/view/{session_id}"))
}
