/*!
 * Pure stage state machine.
 *
 * `SessionState` only changes through `apply`, so every transition can be
 * exercised without a generation service. Downstream sets are replaced
 * wholesale and never edited in place.
 */

use log::{debug, warn};
use std::sync::Arc;

use crate::errors::SessionError;
use crate::subtitle_processor::SubtitleEntry;
use crate::translation::characters::{CharacterRoster, Gender};

use super::models::{Stage, SubtitleSet, View};

/// The human confirmation step between translation and gender fixing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReviewGate {
    #[default]
    Closed,
    /// A proposed roster is open for editing
    AwaitingConfirmation(CharacterRoster),
}

/// Inputs that drive the state machine
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new file replaces everything
    FileLoaded { file_name: String, entries: Vec<SubtitleEntry> },
    /// A stage run finished for the file loaded at `epoch`
    StageCompleted { stage: Stage, epoch: u64, entries: SubtitleSet },
    /// Character analysis produced a roster to review
    RosterProposed(CharacterRoster),
    /// The user changed a character's gender
    RosterEdited { name: String, gender: Gender },
    /// The user accepted the roster
    RosterConfirmed,
    /// The user closed the review without fixing
    ReviewCancelled,
    /// The user switched views
    ViewSelected(View),
}

/// Result of applying an event
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// State changed
    Updated,
    /// The event belonged to a previous file and was dropped
    Discarded,
    /// The gate closed with this frozen roster
    Confirmed(CharacterRoster),
}

/// Snapshot of all stage data for the loaded file
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    file_name: Option<String>,
    original: Option<SubtitleSet>,
    normalized: Option<SubtitleSet>,
    translated: Option<SubtitleSet>,
    fixed: Option<SubtitleSet>,
    gate: ReviewGate,
    view: View,
    // @field: Bumped on every file load
    epoch: u64,
}

impl SessionState {
    /// Empty state: no file, no sets
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event
    pub fn apply(&mut self, event: SessionEvent) -> Result<Applied, SessionError> {
        match event {
            SessionEvent::FileLoaded { file_name, entries } => {
                self.epoch += 1;
                debug!("Loaded '{}' ({} entries), epoch {}", file_name, entries.len(), self.epoch);
                self.file_name = Some(file_name);
                self.original = Some(Arc::new(entries));
                self.normalized = None;
                self.translated = None;
                self.fixed = None;
                self.gate = ReviewGate::Closed;
                self.view = View::Original;
                Ok(Applied::Updated)
            }
            SessionEvent::StageCompleted { stage, epoch, entries } => {
                if epoch != self.epoch {
                    warn!("Dropping {} result for a previous file (epoch {} != {})", stage, epoch, self.epoch);
                    return Ok(Applied::Discarded);
                }
                let slot = match stage {
                    Stage::Original => {
                        warn!("Original data only changes when a file is loaded");
                        return Ok(Applied::Discarded);
                    }
                    Stage::Normalized => &mut self.normalized,
                    Stage::Translated => &mut self.translated,
                    Stage::Fixed => &mut self.fixed,
                };
                *slot = Some(entries);
                self.view = View::from(stage);
                Ok(Applied::Updated)
            }
            SessionEvent::RosterProposed(roster) => {
                self.require_loaded()?;
                self.gate = ReviewGate::AwaitingConfirmation(roster);
                Ok(Applied::Updated)
            }
            SessionEvent::RosterEdited { name, gender } => match &mut self.gate {
                ReviewGate::AwaitingConfirmation(roster) => {
                    if roster.set_gender(&name, gender) {
                        Ok(Applied::Updated)
                    } else {
                        Err(SessionError::UnknownCharacter(name))
                    }
                }
                ReviewGate::Closed => Err(SessionError::NotAwaitingConfirmation),
            },
            SessionEvent::RosterConfirmed => match std::mem::take(&mut self.gate) {
                ReviewGate::AwaitingConfirmation(roster) => Ok(Applied::Confirmed(roster)),
                ReviewGate::Closed => Err(SessionError::NotAwaitingConfirmation),
            },
            SessionEvent::ReviewCancelled => match self.gate {
                ReviewGate::AwaitingConfirmation(_) => {
                    self.gate = ReviewGate::Closed;
                    Ok(Applied::Updated)
                }
                ReviewGate::Closed => Err(SessionError::NotAwaitingConfirmation),
            },
            SessionEvent::ViewSelected(view) => {
                self.view = view;
                Ok(Applied::Updated)
            }
        }
    }

    fn require_loaded(&self) -> Result<(), SessionError> {
        if self.original.is_none() {
            return Err(SessionError::NoFileLoaded);
        }
        Ok(())
    }

    /// Input set for producing `stage`, i.e. its predecessor's data
    pub fn input_for(&self, stage: Stage) -> Result<SubtitleSet, SessionError> {
        self.require_loaded()?;
        let requires = stage.predecessor().unwrap_or(Stage::Original);
        self.set(requires)
            .cloned()
            .ok_or(SessionError::StageNotReady { stage, requires })
    }

    /// The set owned by a stage, if produced
    pub fn set(&self, stage: Stage) -> Option<&SubtitleSet> {
        match stage {
            Stage::Original => self.original.as_ref(),
            Stage::Normalized => self.normalized.as_ref(),
            Stage::Translated => self.translated.as_ref(),
            Stage::Fixed => self.fixed.as_ref(),
        }
    }

    /// Loaded file name
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Current load epoch
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Active view
    pub fn view(&self) -> View {
        self.view
    }

    /// Review gate
    pub fn gate(&self) -> &ReviewGate {
        &self.gate
    }

    /// Roster open for review, if any
    pub fn pending_roster(&self) -> Option<&CharacterRoster> {
        match &self.gate {
            ReviewGate::AwaitingConfirmation(roster) => Some(roster),
            ReviewGate::Closed => None,
        }
    }
}
