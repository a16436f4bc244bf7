/*!
 * Session manager driving the stage transitions.
 *
 * This module handles:
 * - Loading subtitle files and resetting downstream stages
 * - Running normalize / translate / fix through the batch pipeline
 * - The character review gate between translation and fixing
 * - Export, API key handling, activity log and status message
 *
 * All state sits behind synchronous locks that are released before any
 * generation call is awaited.
 */

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::{Config, GenerationTask};
use crate::credentials::{mask_credential, CredentialStore};
use crate::errors::{GenerationError, SessionError};
use crate::file_utils::FileManager;
use crate::subtitle_processor::{self, SubtitleEntry, SubtitleFile};
use crate::translation::{BatchPipeline, CharacterRoster, CredentialCheck, Gender, GenerationService};

use super::models::{ActivityLog, LogLine, Stage, SubtitleSet, View};
use super::state::{Applied, SessionEvent, SessionState};

/// Marks a stage as in flight until dropped
struct InFlight<'a> {
    stages: &'a Mutex<HashSet<Stage>>,
    stage: Stage,
}

impl<'a> InFlight<'a> {
    fn acquire(stages: &'a Mutex<HashSet<Stage>>, stage: Stage) -> Result<Self, SessionError> {
        if !stages.lock().insert(stage) {
            return Err(SessionError::StageBusy(stage));
        }
        Ok(Self { stages, stage })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.stages.lock().remove(&self.stage);
    }
}

/// Session manager for one user working on one file at a time
pub struct SessionManager {
    /// Generation calls
    service: GenerationService,

    /// Batch runner
    pipeline: BatchPipeline,

    /// Where the API key lives
    credentials: Arc<dyn CredentialStore>,

    /// Target language code, used for the export file name
    target_language: String,

    state: Mutex<SessionState>,
    activity: Mutex<ActivityLog>,
    status: Mutex<String>,
    in_flight: Mutex<HashSet<Stage>>,

    // @field: Directory of the loaded file, default export location
    source_dir: Mutex<Option<PathBuf>>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(
        service: GenerationService,
        pipeline: BatchPipeline,
        credentials: Arc<dyn CredentialStore>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            service,
            pipeline,
            credentials,
            target_language: target_language.into(),
            state: Mutex::new(SessionState::new()),
            activity: Mutex::new(ActivityLog::new()),
            status: Mutex::new("Load a subtitle file to begin.".to_string()),
            in_flight: Mutex::new(HashSet::new()),
            source_dir: Mutex::new(None),
        }
    }

    /// Create a session manager from the application config
    pub fn from_config(config: &Config, credentials: Arc<dyn CredentialStore>) -> Self {
        Self::new(
            GenerationService::from_config(config),
            BatchPipeline::from_config(&config.pipeline),
            credentials,
            config.target_language.clone(),
        )
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Copy of the current state; subtitle sets are shared, not copied
    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// The set owned by a stage
    pub fn stage_set(&self, stage: Stage) -> Option<SubtitleSet> {
        self.state.lock().set(stage).cloned()
    }

    /// Roster currently open for review
    pub fn pending_roster(&self) -> Option<CharacterRoster> {
        self.state.lock().pending_roster().cloned()
    }

    /// Activity log, newest first
    pub fn activity(&self) -> Vec<LogLine> {
        self.activity.lock().lines().cloned().collect()
    }

    /// Current status message
    pub fn status(&self) -> String {
        self.status.lock().clone()
    }

    /// Whether any stage run is in flight
    pub fn is_busy(&self) -> bool {
        !self.in_flight.lock().is_empty()
    }

    fn log(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        self.activity.lock().push(message);
    }

    fn set_status(&self, message: impl Into<String>) {
        *self.status.lock() = message.into();
    }

    fn fail(&self, task: GenerationTask, error: SessionError) -> SessionError {
        error!("{} failed: {}", task, error);
        self.log(format!("Error in \"{}\": {}", task, error));
        self.set_status(format!("Error: {}", error));
        error
    }

    fn credential(&self) -> String {
        self.credentials.get().unwrap_or_default()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load subtitle text under a file name
    pub fn load_file(&self, file_name: &str, content: &str) -> usize {
        *self.source_dir.lock() = None;
        self.load_entries(file_name, subtitle_processor::parse(content))
    }

    fn load_entries(&self, file_name: &str, entries: Vec<SubtitleEntry>) -> usize {
        let count = entries.len();

        // FileLoaded is accepted in every state
        if let Err(e) = self.state.lock().apply(SessionEvent::FileLoaded {
            file_name: file_name.to_string(),
            entries,
        }) {
            warn!("Unexpected error loading {}: {}", file_name, e);
        }

        info!("Loaded {} with {} entries", file_name, count);
        self.log(format!("Loaded file: {} ({} entries)", file_name, count));
        self.set_status(format!("Loaded {} entries from {}.", count, file_name));
        count
    }

    /// Load a subtitle file from disk
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<usize, SessionError> {
        let path = path.as_ref();
        let file = SubtitleFile::load(path).map_err(|e| {
            let error = SessionError::File(format!("{:#}", e));
            self.log(format!("Could not load {}: {}", path.display(), error));
            error
        })?;

        *self.source_dir.lock() = Some(FileManager::parent_dir(path));
        let SubtitleFile { file_name, entries } = file;
        Ok(self.load_entries(&file_name, entries))
    }

    /// Switch the active view
    pub fn select_view(&self, view: View) {
        // ViewSelected never fails
        let _ = self.state.lock().apply(SessionEvent::ViewSelected(view));
    }

    // =========================================================================
    // Stage runs
    // =========================================================================

    /// Normalize the original text
    pub async fn normalize(&self, on_progress: impl FnMut(usize, usize)) -> Result<SubtitleSet, SessionError> {
        let service = &self.service;
        self.run_stage(
            Stage::Normalized,
            |credential, text| async move { service.normalize_text(&credential, &text).await },
            on_progress,
        )
        .await
    }

    /// Translate the normalized text
    pub async fn translate(&self, on_progress: impl FnMut(usize, usize)) -> Result<SubtitleSet, SessionError> {
        let service = &self.service;
        self.run_stage(
            Stage::Translated,
            |credential, text| async move { service.translate_text(&credential, &text).await },
            on_progress,
        )
        .await
    }

    async fn run_stage<F, Fut, P>(&self, stage: Stage, transform: F, mut on_progress: P) -> Result<SubtitleSet, SessionError>
    where
        F: FnMut(String, String) -> Fut,
        Fut: Future<Output = Result<String, GenerationError>>,
        P: FnMut(usize, usize),
    {
        let Some(task) = stage.task() else {
            return Err(SessionError::StageNotReady { stage, requires: stage });
        };
        let _guard = InFlight::acquire(&self.in_flight, stage)?;

        let (input, epoch) = {
            let state = self.state.lock();
            (state.input_for(stage)?, state.epoch())
        };
        let credential = self.credential();

        self.log(format!("Starting {}...", task));
        self.set_status(format!("{}: starting...", task));

        let result = self
            .pipeline
            .run(task, &credential, &input, transform, |completed, total| {
                self.set_status(format!("{}: processed batch {} / {}...", task, completed, total));
                on_progress(completed, total);
            })
            .await;

        let entries = match result {
            Ok(entries) => Arc::new(entries),
            Err(e) => return Err(self.fail(task, e.into())),
        };

        let applied = self.state.lock().apply(SessionEvent::StageCompleted {
            stage,
            epoch,
            entries: entries.clone(),
        })?;
        if applied == Applied::Discarded {
            return Err(self.fail(task, SessionError::FileChanged(stage)));
        }

        self.log(format!("{} completed.", task));
        self.set_status(format!("{} completed.", task));
        Ok(entries)
    }

    // =========================================================================
    // Character review
    // =========================================================================

    /// Analyze the translated text and open the review gate
    pub async fn analyze_characters(&self) -> Result<CharacterRoster, SessionError> {
        let task = GenerationTask::AnalyzeCharacters;
        let _guard = InFlight::acquire(&self.in_flight, Stage::Fixed)?;

        let (input, epoch) = {
            let state = self.state.lock();
            (state.input_for(Stage::Fixed)?, state.epoch())
        };

        self.log("Starting character analysis...");
        self.set_status("Analyzing characters...");

        let full_text = input.iter().map(|entry| entry.text.as_str()).collect::<Vec<_>>().join("\n");
        let roster = match self.service.analyze_characters(&self.credential(), &full_text).await {
            Ok(roster) => roster,
            Err(e) => return Err(self.fail(task, e.into())),
        };

        {
            let mut state = self.state.lock();
            if state.epoch() != epoch {
                drop(state);
                return Err(self.fail(task, SessionError::FileChanged(Stage::Fixed)));
            }
            state.apply(SessionEvent::RosterProposed(roster.clone()))?;
        }

        self.log(format!("Analysis finished. Found {} characters.", roster.len()));
        self.set_status("Review the characters, then confirm to fix gender.");
        Ok(roster)
    }

    /// Change a character's gender in the open review
    pub fn set_character_gender(&self, name: &str, gender: Gender) -> Result<(), SessionError> {
        self.state.lock().apply(SessionEvent::RosterEdited {
            name: name.to_string(),
            gender,
        })?;
        self.log(format!("Set {} to {}", name, gender));
        Ok(())
    }

    /// Close the review without fixing
    pub fn cancel_review(&self) -> Result<(), SessionError> {
        self.state.lock().apply(SessionEvent::ReviewCancelled)?;
        self.log("Character review cancelled.");
        self.set_status("Character review cancelled.");
        Ok(())
    }

    /// Confirm the roster and run the gender fix over the translated text
    ///
    /// This is the only way the fix stage can run.
    pub async fn confirm_roster(&self, on_progress: impl FnMut(usize, usize)) -> Result<SubtitleSet, SessionError> {
        if self.in_flight.lock().contains(&Stage::Fixed) {
            return Err(SessionError::StageBusy(Stage::Fixed));
        }

        let (roster, epoch) = {
            let mut state = self.state.lock();
            match state.apply(SessionEvent::RosterConfirmed)? {
                Applied::Confirmed(roster) => (roster, state.epoch()),
                _ => return Err(SessionError::NotAwaitingConfirmation),
            }
        };
        self.log("Gender confirmed. Starting fix...");

        let roster_json = roster.to_prompt_json();
        let roster_json = roster_json.as_str();
        let service = &self.service;
        let result = self
            .run_stage(
                Stage::Fixed,
                |credential, text| async move { service.fix_gender_in_text(&credential, &text, roster_json).await },
                on_progress,
            )
            .await;

        if let Err(e) = &result {
            if e.is_before_dispatch() {
                self.reopen_review(roster, epoch);
            }
        }
        result
    }

    // Puts the confirmed roster back up for review when no request was sent
    fn reopen_review(&self, roster: CharacterRoster, epoch: u64) {
        let mut state = self.state.lock();
        if state.epoch() != epoch {
            return;
        }
        if state.apply(SessionEvent::RosterProposed(roster)).is_ok() {
            drop(state);
            self.log("Character review reopened.");
        }
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Serialized fixed subtitles
    pub fn export_text(&self) -> Result<String, SessionError> {
        let fixed = self.stage_set(Stage::Fixed).ok_or(SessionError::NothingToExport)?;
        Ok(subtitle_processor::serialize(&fixed))
    }

    /// File name the export is written under
    pub fn export_file_name(&self) -> Result<String, SessionError> {
        let state = self.state.lock();
        let file_name = state.file_name().ok_or(SessionError::NoFileLoaded)?;
        Ok(subtitle_processor::export_file_name(file_name, &self.target_language))
    }

    /// Write the fixed subtitles next to the source file, or into `output_dir`
    pub fn export(&self, output_dir: Option<&Path>) -> Result<PathBuf, SessionError> {
        let content = self.export_text()?;
        let file_name = self.export_file_name()?;
        let dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => self.source_dir.lock().clone().unwrap_or_else(|| PathBuf::from(".")),
        };
        let path = dir.join(file_name);

        FileManager::write_to_file(&path, &content).map_err(|e| {
            let error = SessionError::File(format!("{:#}", e));
            self.log(format!("Export failed: {}", error));
            error
        })?;

        info!("Exported {}", path.display());
        self.log(format!("Exported file: {}", path.display()));
        self.set_status(format!("Exported {}", path.display()));
        Ok(path)
    }

    // =========================================================================
    // API key
    // =========================================================================

    /// Persist a new API key
    pub fn save_credential(&self, credential: &str) -> Result<(), SessionError> {
        let credential = credential.trim();
        self.credentials
            .set(credential)
            .map_err(|e| SessionError::File(format!("{:#}", e)))?;
        self.log(format!("API key saved ({})", mask_credential(credential)));
        Ok(())
    }

    /// Whether a non-empty key is stored
    pub fn has_credential(&self) -> bool {
        !self.credential().trim().is_empty()
    }

    /// Check a key, or the stored one when `credential` is `None`
    pub async fn check_credential(&self, credential: Option<&str>) -> CredentialCheck {
        let credential = credential.map(str::to_string).unwrap_or_else(|| self.credential());
        let check = self.service.check_credential(&credential).await;
        self.log(format!("API key check: {}", check.message));
        check
    }
}
