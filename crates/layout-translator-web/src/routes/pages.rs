//! Page routes - full HTML page renders.

use axum::extract::{Path, State};
use std::sync::Arc;

use crate::helpers::{OptionExt, RouteResult};
use crate::state::AppState;
use crate::templates::{AppTemplate, IndexTemplate};

/// Landing page with upload form.
pub async fn index(State(state): State<Arc<AppState>>) -> IndexTemplate {
    IndexTemplate {
        upload_url: "/api/upload".to_string(),
        soft_limit_mb: state.config.upload_soft_limit_mb,
    }
}

/// Session page: upload area when empty, dual pane once a file is selected.
pub async fn view_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> RouteResult<AppTemplate> {
    let view = super::snapshot(&state, &session_id)
        .await
        .or_not_found("Session not found")?;

    Ok(AppTemplate::new(view, state.config.upload_soft_limit_mb))
}
