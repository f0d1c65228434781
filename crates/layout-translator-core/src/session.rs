//! Session state and the controller that owns it.
//!
//! All mutation of a [`TranslationState`] goes through [`SessionController`],
//! one event at a time. Status moves `Idle → Translating → {Completed, Error}`;
//! a reset or a new file goes back to `Idle`.
//!
//! Updates from a translation run carry a [`TranslationRun`] ticket. Once the
//! controller installs a fresh state (reset, new file, new run) older tickets
//! go stale and their updates are ignored.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::config::{LanguageOption, default_language, language_by_code};
use crate::error::{Error, Result};
use crate::intake::{self, IncomingFile, SelectedFile};
use crate::translator::{STATUS_TRANSLATING, TranslationClient, TranslationEvent};

/// Lifecycle of one translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationStatus {
    #[default]
    Idle,
    Translating,
    Completed,
    Error,
}

impl TranslationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Translating => "translating",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub const fn is_active(self) -> bool {
        matches!(self, Self::Translating)
    }
}

impl std::fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Revocable local reference to an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle {
    pub id: String,
    /// Where the preview is served from
    pub url: String,
}

/// Creates and releases preview handles. Every handle created must be revoked.
pub trait PreviewRegistry: Send + Sync {
    fn create(&self, file: &SelectedFile) -> Result<PreviewHandle>;

    fn revoke(&self, handle: &PreviewHandle);
}

/// Everything the UI renders from
#[derive(Debug, Clone)]
pub struct TranslationState {
    pub file: Option<SelectedFile>,
    pub preview: Option<PreviewHandle>,
    pub target_language: &'static LanguageOption,
    pub status: TranslationStatus,
    /// `None` before the first run, `Some("")` right after a run starts
    pub translated_content: Option<String>,
    pub error: Option<String>,
    /// Latest progress label from the client
    pub status_message: String,
}

impl Default for TranslationState {
    fn default() -> Self {
        Self {
            file: None,
            preview: None,
            target_language: default_language(),
            status: TranslationStatus::Idle,
            translated_content: None,
            error: None,
            status_message: STATUS_TRANSLATING.to_string(),
        }
    }
}

impl TranslationState {
    pub const fn has_file(&self) -> bool {
        self.file.is_some()
    }

    pub const fn is_translating(&self) -> bool {
        self.status.is_active()
    }

    /// Export is offered once a run has produced output and stopped.
    pub fn can_export(&self) -> bool {
        !self.is_translating() && self.translated_content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Ticket identifying one translation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationRun {
    generation: u64,
}

/// Single owner of a session's [`TranslationState`].
pub struct SessionController {
    state: TranslationState,
    previews: Arc<dyn PreviewRegistry>,
    /// Bumped whenever a fresh state is installed
    generation: u64,
    /// Bumped on every visible change
    revision: u64,
}

impl SessionController {
    pub fn new(previews: Arc<dyn PreviewRegistry>) -> Self {
        Self {
            state: TranslationState::default(),
            previews,
            generation: 0,
            revision: 0,
        }
    }

    /// Start with a target language other than the default.
    pub fn with_language(previews: Arc<dyn PreviewRegistry>, code: &str) -> Self {
        let mut controller = Self::new(previews);
        if let Some(lang) = language_by_code(code) {
            controller.state.target_language = lang;
        }
        controller
    }

    pub const fn state(&self) -> &TranslationState {
        &self.state
    }

    /// Monotonic change counter, for pushing updates to observers.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether `run` is still the one the state belongs to.
    pub const fn is_current(&self, run: TranslationRun) -> bool {
        run.generation == self.generation && self.state.status.is_active()
    }

    const fn touch(&mut self) {
        self.revision += 1;
    }

    fn release_preview(&mut self) {
        if let Some(handle) = self.state.preview.take() {
            debug!("Revoking preview {}", handle.id);
            self.previews.revoke(&handle);
        }
    }

    /// Accept a new file. A rejected file leaves the state untouched.
    pub fn select_file(&mut self, file: IncomingFile) -> Result<()> {
        let selected = intake::accept(file)?;
        self.install_file(selected)
    }

    /// Install a file that already passed intake.
    ///
    /// The old preview is revoked before the new one is created. If creating
    /// it fails the session is left without a document.
    pub fn install_file(&mut self, selected: SelectedFile) -> Result<()> {
        self.release_preview();
        self.generation += 1;
        let target_language = self.state.target_language;

        let handle = match self.previews.create(&selected) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Could not create preview for {}: {}", selected.name, e);
                self.state = TranslationState {
                    target_language,
                    ..TranslationState::default()
                };
                self.touch();
                return Err(e);
            }
        };
        info!("Selected {} ({})", selected.name, selected.display_size());

        self.state = TranslationState {
            file: Some(selected),
            preview: Some(handle),
            target_language,
            ..TranslationState::default()
        };
        self.touch();
        Ok(())
    }

    /// Change the target language. Not allowed while translating.
    pub fn set_language(&mut self, code: &str) -> Result<()> {
        if self.state.is_translating() {
            return Err(Error::ConfigInvalid {
                field: "target_lang".to_string(),
                reason: "cannot change language while translating".to_string(),
            });
        }
        let lang = language_by_code(code).ok_or_else(|| Error::ConfigInvalid {
            field: "target_lang".to_string(),
            reason: format!("unsupported language '{code}'"),
        })?;
        if lang != self.state.target_language {
            self.state.target_language = lang;
            self.touch();
        }
        Ok(())
    }

    /// Enter `Translating`. No-op without a file or while a run is active.
    ///
    /// Returns the file and language to translate with, plus the run ticket.
    pub fn begin_translation(&mut self) -> Option<(TranslationRun, SelectedFile, &'static LanguageOption)> {
        if self.state.is_translating() {
            debug!("Translation already running");
            return None;
        }
        let file = self.state.file.clone()?;

        self.generation += 1;
        self.state.status = TranslationStatus::Translating;
        self.state.error = None;
        self.state.translated_content = Some(String::new());
        self.state.status_message = STATUS_TRANSLATING.to_string();
        self.touch();

        Some((
            TranslationRun {
                generation: self.generation,
            },
            file,
            self.state.target_language,
        ))
    }

    /// Apply one progress event. Returns `false` if the run is stale.
    pub fn apply(&mut self, run: TranslationRun, event: TranslationEvent) -> bool {
        if !self.is_current(run) {
            return false;
        }
        match event {
            TranslationEvent::Status(message) => self.state.status_message = message,
            TranslationEvent::Content(html) => self.state.translated_content = Some(html),
        }
        self.touch();
        true
    }

    /// The stream ended without error.
    pub fn complete(&mut self, run: TranslationRun) -> bool {
        if !self.is_current(run) {
            return false;
        }
        self.state.status = TranslationStatus::Completed;
        self.touch();
        true
    }

    /// The client reported a failure.
    pub fn fail(&mut self, run: TranslationRun, error: &Error) -> bool {
        if !self.is_current(run) {
            return false;
        }
        warn!("Translation failed: {}", error);
        self.state.status = TranslationStatus::Error;
        self.state.error = Some(error.user_message());
        self.touch();
        true
    }

    /// Back to the initial state, releasing the preview.
    pub fn reset(&mut self) {
        self.release_preview();
        self.generation += 1;
        self.state = TranslationState::default();
        self.touch();
    }

    /// Hide the error banner. The status stays `Error`.
    pub fn dismiss_error(&mut self) {
        if self.state.error.take().is_some() {
            self.touch();
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.release_preview();
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("status", &self.state.status)
            .field("generation", &self.generation)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

/// How a driven translation run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Completed,
    Failed(Error),
    /// The sink stopped accepting events
    Abandoned,
}

/// Consume a translation stream, handing every event to `sink`.
///
/// `sink` resolves to `false` once nobody is interested in the run anymore
/// (e.g. the session was reset), which drops the stream.
pub async fn drive_translation<F, Fut>(
    client: &TranslationClient,
    file: &SelectedFile,
    target: &LanguageOption,
    mut sink: F,
) -> RunOutcome
where
    F: FnMut(TranslationEvent) -> Fut,
    Fut: Future<Output = bool>,
{
    let mut stream = client.translate(file, target.name);
    while let Some(event) = stream.next().await {
        match event {
            Ok(event) => {
                if !sink(event).await {
                    debug!("Run for {} abandoned", file.name);
                    return RunOutcome::Abandoned;
                }
            }
            Err(e) => return RunOutcome::Failed(e),
        }
    }
    RunOutcome::Completed
}
