use std::fmt;
use std::path::Path;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context};
use log::{warn, debug};
use serde::{Deserialize, Serialize};

use crate::file_utils::FileManager;

// @module: Subtitle parsing and serialization

// @const: Blank-line block separator (tolerates whitespace-only lines and CRLF)
static BLOCK_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\n").unwrap()
});

/// Token that every time-range line must contain
pub const TIME_RANGE_SEPARATOR: &str = "-->";

/// Suffix appended to exported files, before the language code
pub const EXPORT_SUFFIX: &str = "fixed";

// @struct: Single subtitle cue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleEntry {
    // @field: Cue id, unique within a file
    pub id: u64,

    // @field: Display range, kept verbatim ("<start> --> <end>")
    pub time: String,

    // @field: Payload, may span several lines
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(id: u64, time: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            time: time.into(),
            text: text.into(),
        }
    }

    /// Copy of this entry carrying a different payload
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            id: self.id,
            time: self.time.clone(),
            text: text.into(),
        }
    }

    /// Parse one block; `None` when the block is not a valid cue
    fn from_block(block: &str) -> Option<Self> {
        let lines: Vec<&str> = block.trim().lines().collect();
        if lines.len() < 3 {
            return None;
        }

        let id = lines[0].trim().parse::<u64>().ok()?;
        let time = lines[1];
        if !time.contains(TIME_RANGE_SEPARATOR) {
            return None;
        }

        Some(Self::new(id, time, lines[2..].join("\n")))
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\n{}\n{}", self.id, self.time, self.text)
    }
}

/// Parse subtitle text into entries.
///
/// Blocks that do not look like a cue are skipped with a warning; a bad
/// block never fails the whole parse.
pub fn parse(content: &str) -> Vec<SubtitleEntry> {
    // A leading byte order mark is not whitespace to `trim`
    let content = content.trim_start_matches('\u{feff}').trim();
    if content.is_empty() {
        return Vec::new();
    }

    let mut entries = Vec::new();
    let mut skipped = 0;

    for block in BLOCK_SEPARATOR.split(content) {
        match SubtitleEntry::from_block(block) {
            Some(entry) => entries.push(entry),
            None => {
                skipped += 1;
                warn!("Skipping malformed subtitle block: {:?}", block.trim());
            }
        }
    }

    if skipped > 0 {
        debug!("Parsed {} entries, skipped {} malformed blocks", entries.len(), skipped);
    }

    entries
}

/// Render entries back to subtitle text, one blank line between cues
pub fn serialize(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .map(|entry| entry.to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A loaded subtitle file
#[derive(Debug, Clone)]
pub struct SubtitleFile {
    /// Name of the source file (no directory)
    pub file_name: String,

    /// Parsed entries
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleFile {
    /// Parse in-memory content under the given file name
    pub fn from_content(file_name: impl Into<String>, content: &str) -> Self {
        Self {
            file_name: file_name.into(),
            entries: parse(content),
        }
    }

    /// Read and parse a subtitle file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .with_context(|| format!("Path has no file name: {:?}", path))?;

        Ok(Self::from_content(file_name, &content))
    }

    /// Name of the exported file for the given target language
    pub fn export_file_name(&self, target_language: &str) -> String {
        export_file_name(&self.file_name, target_language)
    }
}

/// `<basename>.fixed.<lang>.srt`, where a trailing `.srt` is stripped from the source name
pub fn export_file_name(source_file_name: &str, target_language: &str) -> String {
    let base_name = source_file_name
        .strip_suffix(".srt")
        .unwrap_or(source_file_name);
    format!("{}.{}.{}.srt", base_name, EXPORT_SUFFIX, target_language)
}
