//! Settings routes - target language selection.

use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use std::sync::Arc;

use super::LanguageForm;
use crate::helpers::{OptionExt, RouteResult};
use crate::state::AppState;
use crate::templates::{ControlsTemplate, WorkspaceView};

/// Change the target language - returns the refreshed controls bar.
///
/// Rejected with 409 while a translation is running.
pub async fn set_language(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Form(form): Form<LanguageForm>,
) -> RouteResult<ControlsTemplate> {
    let session_ref = state
        .get_session(&session_id)
        .await
        .or_not_found("Session not found")?;

    let soft_limit = state.config.upload_soft_limit_bytes();
    let view = session_ref
        .with_session_mut(|s| {
            if s.controller.state().is_translating() {
                return Err((
                    StatusCode::CONFLICT,
                    "Cannot change language while translating".to_string(),
                ));
            }
            s.controller
                .set_language(&form.target_lang)
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            Ok(WorkspaceView::new(&session_id, s.controller.state(), soft_limit))
        })
        .await
        .or_not_found("Session not found")??;

    Ok(ControlsTemplate { view, oob: false })
}
