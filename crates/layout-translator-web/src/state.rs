use anyhow::{Context, Result};
use layout_translator_core::{
    AppConfig, RunOutcome, SessionController, TranslationClient,
    TranslationEvent, TranslationRun, client_from_config,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::preview_store::PreviewStore;

/// Sessions idle for longer than this are dropped by the cleanup task
pub const SESSION_MAX_IDLE: Duration = Duration::from_secs(3600);

/// One browser session
pub struct Session {
    pub controller: SessionController,
    pub last_active: Instant,
}

/// Global application state
pub struct AppState {
    /// Active sessions indexed by UUID
    sessions: RwLock<HashMap<Uuid, Session>>,
    /// Shared by all sessions; each controller keeps at most one entry alive
    pub previews: Arc<PreviewStore>,
    pub client: TranslationClient,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = client_from_config(&config).context("Failed to create translation client")?;
        Self::with_client(config, client)
    }

    /// Build state around an existing client (tests inject a scripted model).
    pub fn with_client(config: AppConfig, client: TranslationClient) -> Result<Self> {
        let previews = Arc::new(PreviewStore::new().context("Failed to create preview store")?);
        Ok(Self {
            sessions: RwLock::new(HashMap::new()),
            previews,
            client,
            config,
        })
    }

    /// A controller wired to the shared preview store, not yet registered.
    pub fn new_controller(&self) -> SessionController {
        SessionController::with_language(self.previews.clone(), self.config.target_lang.as_str())
    }

    /// Register a session and return its ID (for URL embedding).
    pub async fn insert_session(&self, controller: SessionController) -> String {
        let id = Uuid::new_v4();
        let session = Session {
            controller,
            last_active: Instant::now(),
        };
        self.sessions.write().await.insert(id, session);
        id.to_string()
    }

    /// Get a session by ID string.
    ///
    /// Returns `None` if the ID is not a valid UUID or session doesn't exist.
    pub async fn get_session(&self, id: &str) -> Option<SessionRef<'_>> {
        let uuid = Uuid::parse_str(id).ok()?;
        let sessions = self.sessions.read().await;
        sessions.contains_key(&uuid).then_some(SessionRef { id: uuid, state: self })
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Feed one event of a run into its session. `false` stops the run.
    pub async fn apply_event(&self, session_id: &str, run: TranslationRun, event: TranslationEvent) -> bool {
        let Some(session) = self.get_session(session_id).await else {
            return false;
        };
        session
            .with_session_mut(|s| s.controller.apply(run, event))
            .await
            .unwrap_or(false)
    }

    /// Record how a run ended.
    pub async fn finish_run(&self, session_id: &str, run: TranslationRun, outcome: RunOutcome) {
        let Some(session) = self.get_session(session_id).await else {
            debug!("Session {} is gone, dropping run outcome", session_id);
            return;
        };
        session
            .with_session_mut(|s| match outcome {
                RunOutcome::Completed => {
                    s.controller.complete(run);
                }
                RunOutcome::Failed(ref e) => {
                    s.controller.fail(run, e);
                }
                RunOutcome::Abandoned => {}
            })
            .await;
    }

    /// Drop sessions idle for longer than [`SESSION_MAX_IDLE`].
    pub async fn cleanup_old_sessions(&self) -> usize {
        self.cleanup_sessions_idle_for(SESSION_MAX_IDLE).await
    }

    /// Dropping a controller revokes its preview.
    pub async fn cleanup_sessions_idle_for(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let before = sessions.len();

        sessions.retain(|_, session| now.duration_since(session.last_active) < max_idle);

        let removed = before - sessions.len();
        if removed > 0 {
            info!("Dropped {} idle sessions", removed);
        }
        removed
    }
}

/// A borrowed reference to a session that provides safe access patterns.
///
/// Locks are only taken inside synchronous closures, so no guard is ever
/// held across an `.await`.
///
/// ```ignore
/// let (file, lang) = session.with_session(|s| (s.file.clone(), s.lang)).await?;
/// do_async_work(file, lang).await;
/// ```
pub struct SessionRef<'a> {
    id: Uuid,
    state: &'a AppState,
}

impl SessionRef<'_> {
    /// Access session data immutably within a closure.
    pub async fn with_session<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&Session) -> R,
    {
        let sessions = self.state.sessions.read().await;
        sessions.get(&self.id).map(f)
    }

    /// Access session data mutably within a closure.
    ///
    /// Counts as activity for idle cleanup.
    pub async fn with_session_mut<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut sessions = self.state.sessions.write().await;
        sessions.get_mut(&self.id).map(|s| {
            s.last_active = Instant::now();
            f(s)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layout_translator_core::{GeminiConfig, IncomingFile, TranslationStatus};

    fn state() -> AppState {
        let config = AppConfig {
            gemini: GeminiConfig::new("http://127.0.0.1:9", None, "test"),
            ..AppConfig::default()
        };
        AppState::new(config).unwrap()
    }

    fn pdf() -> IncomingFile {
        IncomingFile::new("a.pdf", Some("application/pdf".to_string()), b"%PDF".to_vec())
    }

    #[tokio::test]
    async fn test_session_lookup() {
        let state = state();
        let id = state.insert_session(state.new_controller()).await;
        assert!(state.get_session(&id).await.is_some());
        assert!(state.get_session("not-a-uuid").await.is_none());
        assert!(state.get_session(&Uuid::new_v4().to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_stale_run_events_rejected() {
        let state = state();
        let mut controller = state.new_controller();
        controller.select_file(pdf()).unwrap();
        let (run, _, _) = controller.begin_translation().unwrap();
        let id = state.insert_session(controller).await;

        assert!(state.apply_event(&id, run, TranslationEvent::Content("<p>a".into())).await);

        let session = state.get_session(&id).await.unwrap();
        session.with_session_mut(|s| s.controller.reset()).await;
        assert!(!state.apply_event(&id, run, TranslationEvent::Content("<p>b".into())).await);

        state.finish_run(&id, run, RunOutcome::Completed).await;
        let status = session.with_session(|s| s.controller.state().status).await;
        assert_eq!(status, Some(TranslationStatus::Idle));
    }

    #[tokio::test]
    async fn test_cleanup_revokes_previews() {
        let state = state();
        let mut controller = state.new_controller();
        controller.select_file(pdf()).unwrap();
        state.insert_session(controller).await;
        assert_eq!(state.previews.outstanding(), 1);

        assert_eq!(state.cleanup_old_sessions().await, 0);
        assert_eq!(state.cleanup_sessions_idle_for(Duration::ZERO).await, 1);
        assert_eq!(state.session_count().await, 0);
        assert_eq!(state.previews.outstanding(), 0);
    }
}
