//! Translation routes - start a run and stream its progress.

use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use layout_translator_core::drive_translation;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::helpers::{OptionExt, RouteResult};
use crate::state::AppState;
use crate::templates::{StartedTemplate, UpdateTemplate, WorkspaceView};

/// How often the stream checks the session for changes
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Start translating the selected file.
///
/// Returns the SSE sink plus out-of-band refreshes; htmx swaps it into
/// `#stream-slot`. Without a file, or while a run is active, nothing starts
/// and the current state is returned.
pub async fn start_translation(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> RouteResult<StartedTemplate> {
    let session_ref = state
        .get_session(&session_id)
        .await
        .or_not_found("Session not found")?;

    let soft_limit = state.config.upload_soft_limit_bytes();
    let (started, view) = session_ref
        .with_session_mut(|s| {
            let started = s.controller.begin_translation();
            (started, WorkspaceView::new(&session_id, s.controller.state(), soft_limit))
        })
        .await
        .or_not_found("Session not found")?;

    let Some((run, file, lang)) = started else {
        debug!("Nothing to translate in session {}", session_id);
        return Ok(StartedTemplate::new(view));
    };

    info!("Session {}: translating {} into {}", session_id, file.name, lang.name);

    let task_state = Arc::clone(&state);
    let task_session = session_id.clone();
    tokio::spawn(async move {
        let outcome = drive_translation(&task_state.client, &file, lang, |event| {
            let state = Arc::clone(&task_state);
            let session_id = task_session.clone();
            async move { state.apply_event(&session_id, run, event).await }
        })
        .await;
        debug!("Session {}: run ended with {:?}", task_session, outcome);
        task_state.finish_run(&task_session, run, outcome).await;
    });

    Ok(StartedTemplate::new(view))
}

/// SSE stream of session updates while a translation runs.
///
/// Pushes an `update` event whenever the session changes and a final `done`
/// once the run is over (completed, failed, reset or session gone).
#[allow(tail_expr_drop_order)]
pub async fn translation_stream(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    state
        .get_session(&session_id)
        .await
        .or_not_found("Session not found")?;

    let soft_limit = state.config.upload_soft_limit_bytes();

    let stream = async_stream::stream! {
        let mut last_revision = None;

        loop {
            let snapshot = match state.get_session(&session_id).await {
                Some(session_ref) => {
                    session_ref
                        .with_session(|s| {
                            let revision = s.controller.revision();
                            (last_revision != Some(revision)).then(|| {
                                (revision, WorkspaceView::new(&session_id, s.controller.state(), soft_limit))
                            })
                        })
                        .await
                }
                None => None,
            };

            let Some(changed) = snapshot else {
                // Session dropped while streaming
                yield Ok(Event::default().event("done").data(""));
                break;
            };

            if let Some((revision, view)) = changed {
                last_revision = Some(revision);
                let finished = !view.is_translating;

                match UpdateTemplate::new(view).render() {
                    Ok(html) => {
                        // SSE data cannot carry carriage returns
                        yield Ok(Event::default().event("update").data(html.replace('\r', "")));
                    }
                    Err(e) => warn!("Failed to render update: {}", e),
                }

                if finished {
                    yield Ok(Event::default().event("done").data(""));
                    break;
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
