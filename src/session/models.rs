/*!
 * Session-level models.
 *
 * Stages and views of the pipeline, the shared subtitle snapshot type,
 * and the activity log shown to the user.
 */

use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Arc;

use crate::app_config::GenerationTask;
use crate::subtitle_processor::SubtitleEntry;

/// Immutable snapshot of one stage's entries
pub type SubtitleSet = Arc<Vec<SubtitleEntry>>;

/// A pipeline stage; each one owns at most one subtitle set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Original,
    Normalized,
    Translated,
    Fixed,
}

impl Stage {
    /// The stage whose data feeds this one
    pub fn predecessor(&self) -> Option<Stage> {
        match self {
            Self::Original => None,
            Self::Normalized => Some(Self::Original),
            Self::Translated => Some(Self::Normalized),
            Self::Fixed => Some(Self::Translated),
        }
    }

    /// The generation task that produces this stage
    pub fn task(&self) -> Option<GenerationTask> {
        match self {
            Self::Original => None,
            Self::Normalized => Some(GenerationTask::Normalize),
            Self::Translated => Some(GenerationTask::Translate),
            Self::Fixed => Some(GenerationTask::FixGender),
        }
    }

    // @returns: Human-readable stage name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Original => "Original",
            Self::Normalized => "Normalized",
            Self::Translated => "Translated",
            Self::Fixed => "Fixed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What the user is looking at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Original,
    Normalized,
    Translated,
    Fixed,
    Log,
}

impl View {
    /// The stage shown by this view, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Original => Some(Stage::Original),
            Self::Normalized => Some(Stage::Normalized),
            Self::Translated => Some(Stage::Translated),
            Self::Fixed => Some(Stage::Fixed),
            Self::Log => None,
        }
    }

    /// Parse a view name as typed by the user
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "original" | "orig" => Some(Self::Original),
            "normalized" | "norm" => Some(Self::Normalized),
            "translated" | "trans" => Some(Self::Translated),
            "fixed" | "fix" => Some(Self::Fixed),
            "log" => Some(Self::Log),
            _ => None,
        }
    }
}

impl From<Stage> for View {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Original => Self::Original,
            Stage::Normalized => Self::Normalized,
            Stage::Translated => Self::Translated,
            Stage::Fixed => Self::Fixed,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage() {
            Some(stage) => stage.fmt(f),
            None => f.write_str("Log"),
        }
    }
}

/// One timestamped activity message
#[derive(Debug, Clone)]
pub struct LogLine {
    /// When the message was recorded
    pub timestamp: DateTime<Local>,
    /// Message text
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Append-only activity log, read newest first
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    lines: Vec<LogLine>,
}

impl ActivityLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message with the current local time
    pub fn push(&mut self, message: impl Into<String>) {
        self.lines.push(LogLine {
            timestamp: Local::now(),
            message: message.into(),
        });
    }

    /// Lines in reverse-chronological order
    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter().rev()
    }

    /// Number of recorded lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
