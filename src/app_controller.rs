use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app_config::Config;
use crate::credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use crate::errors::{AppError, SessionError};
use crate::session::{SessionManager, Stage, SubtitleSet, View};
use crate::subtitle_processor;
use crate::translation::{CharacterRoster, Gender};

// @module: Interactive controller; every command is one user-triggered transition

const HELP: &str = "Commands:
  load <path>             Load a subtitle file
  key <api-key>           Save the API key
  check-key [api-key]     Check the given or saved API key
  normalize               Normalize the original text
  translate               Translate the normalized text
  analyze                 Analyze characters in the translation
  gender <name> <gender>  Set a character's gender (male/female/unknown)
  confirm                 Confirm the characters and fix gender
  cancel                  Close the character review
  show [view]             Show original/normalized/translated/fixed/log
  export [dir]            Write the fixed subtitles
  log                     Show the activity log
  status                  Show the status line
  help                    Show this help
  quit                    Exit";

/// A parsed interactive command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(PathBuf),
    SaveKey(String),
    CheckKey(Option<String>),
    Normalize,
    Translate,
    Analyze,
    SetGender { name: String, gender: Gender },
    Confirm,
    Cancel,
    Show(Option<View>),
    Export(Option<PathBuf>),
    Log,
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "load" | "open" => {
                if rest.is_empty() {
                    return Err(anyhow!("Usage: load <path>"));
                }
                Self::Load(PathBuf::from(rest))
            }
            "key" => {
                if rest.is_empty() {
                    return Err(anyhow!("Usage: key <api-key>"));
                }
                Self::SaveKey(rest.to_string())
            }
            "check-key" | "check" => Self::CheckKey(Some(rest).filter(|r| !r.is_empty()).map(str::to_string)),
            "normalize" => Self::Normalize,
            "translate" => Self::Translate,
            "analyze" => Self::Analyze,
            "gender" => {
                let (name, label) = rest
                    .rsplit_once(char::is_whitespace)
                    .ok_or_else(|| anyhow!("Usage: gender <name> <male|female|unknown>"))?;
                Self::SetGender {
                    name: name.trim().to_string(),
                    gender: Gender::parse(label),
                }
            }
            "confirm" => Self::Confirm,
            "cancel" => Self::Cancel,
            "show" | "view" => {
                if rest.is_empty() {
                    Self::Show(None)
                } else {
                    let view = View::parse(rest).ok_or_else(|| anyhow!("Unknown view: {}", rest))?;
                    Self::Show(Some(view))
                }
            }
            "export" => Self::Export(Some(rest).filter(|r| !r.is_empty()).map(PathBuf::from)),
            "log" => Self::Log,
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(anyhow!("Unknown command: {} (type 'help')", other)),
        };

        Ok(command)
    }
}

/// Whether the loop keeps reading commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Main application controller for the interactive session
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Stage state and transitions
    session: SessionManager,
}

impl Controller {
    // @method: Create a controller with a file-backed or overridden credential store
    pub fn with_config(config: Config, api_key_override: Option<String>) -> Result<Self, AppError> {
        let credentials: Arc<dyn CredentialStore> = match api_key_override {
            Some(key) => Arc::new(MemoryCredentialStore::with_value(&key)),
            None => match &config.credential_store_path {
                Some(path) => Arc::new(FileCredentialStore::new(path)),
                None => Arc::new(FileCredentialStore::default_location()?),
            },
        };

        let session = SessionManager::from_config(&config, credentials);
        Ok(Self { config, session })
    }

    /// Create a controller over an existing session manager
    pub fn with_session(config: Config, session: SessionManager) -> Self {
        Self { config, session }
    }

    /// The session driven by this controller
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Read commands from stdin until `quit` or end of input
    pub async fn run_interactive(&self, initial_file: Option<PathBuf>) -> Result<(), AppError> {
        info!(
            "Subtitle session: {} -> {}",
            crate::language_utils::display_name(&self.config.source_language),
            crate::language_utils::display_name(&self.config.target_language)
        );
        if !self.session.has_credential() {
            warn!("No API key saved yet. Use 'key <api-key>' before processing.");
        }
        println!("{}", HELP);

        if let Some(path) = initial_file {
            self.report(self.execute(Command::Load(path)).await);
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("subfix> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let outcome = match Command::parse(&line) {
                Ok(command) => self.execute(command).await,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };
            if let Ok(Flow::Quit) = outcome {
                break;
            }
            self.report(outcome);
        }

        Ok(())
    }

    fn report(&self, outcome: Result<Flow, AppError>) {
        if let Err(e) = outcome {
            println!("Error: {}", e);
        }
    }

    /// Execute one command
    pub async fn execute(&self, command: Command) -> Result<Flow, AppError> {
        match command {
            Command::Load(path) => {
                let count = self.session.load_path(&path)?;
                println!("Loaded {} entries.", count);
            }
            Command::SaveKey(key) => {
                self.session.save_credential(&key)?;
                println!("API key saved.");
            }
            Command::CheckKey(key) => {
                let check = self.session.check_credential(key.as_deref()).await;
                println!("{} {}", if check.valid { "OK:" } else { "FAILED:" }, check.message);
            }
            Command::Normalize => self.run_stage(Stage::Normalized).await?,
            Command::Translate => self.run_stage(Stage::Translated).await?,
            Command::Analyze => {
                let roster = self.session.analyze_characters().await?;
                println!("{}", Self::render_roster(&roster));
                println!("Edit with 'gender <name> <gender>', then 'confirm' or 'cancel'.");
            }
            Command::SetGender { name, gender } => {
                self.session.set_character_gender(&name, gender)?;
                if let Some(roster) = self.session.pending_roster() {
                    println!("{}", Self::render_roster(&roster));
                }
            }
            Command::Confirm => self.run_stage(Stage::Fixed).await?,
            Command::Cancel => {
                self.session.cancel_review()?;
                println!("Character review cancelled.");
            }
            Command::Show(view) => {
                if let Some(view) = view {
                    self.session.select_view(view);
                }
                println!("{}", self.render_view(self.session.state().view()));
            }
            Command::Export(dir) => {
                let path = self.session.export(dir.as_deref())?;
                println!("Exported {}", path.display());
            }
            Command::Log => println!("{}", self.render_view(View::Log)),
            Command::Status => println!("{}", self.session.status()),
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    async fn run_stage(&self, stage: Stage) -> Result<(), SessionError> {
        let start_time = Instant::now();
        let progress_bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%)"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message(stage.to_string());

        let on_progress = |completed: usize, total: usize| {
            progress_bar.set_length(total as u64);
            progress_bar.set_position(completed as u64);
        };

        let result: Result<SubtitleSet, SessionError> = match stage {
            Stage::Normalized => self.session.normalize(on_progress).await,
            Stage::Translated => self.session.translate(on_progress).await,
            Stage::Fixed => self.session.confirm_roster(on_progress).await,
            Stage::Original => Err(SessionError::StageNotReady { stage, requires: stage }),
        };
        progress_bar.finish_and_clear();

        match result {
            Ok(entries) => {
                info!(
                    "{} finished in {} ({} entries)",
                    stage,
                    Self::format_duration(start_time.elapsed()),
                    entries.len()
                );
                println!("{}", self.render_view(View::from(stage)));
                Ok(())
            }
            Err(e) => {
                error!("{}", e);
                Err(e)
            }
        }
    }

    /// Text shown for a view
    pub fn render_view(&self, view: View) -> String {
        match view.stage() {
            Some(stage) => match self.session.stage_set(stage) {
                Some(entries) => format!("== {} ==\n{}", stage, subtitle_processor::serialize(&entries)),
                None => format!("== {} ==\n(no data yet)", stage),
            },
            None => {
                let lines: Vec<String> = self.session.activity().iter().map(ToString::to_string).collect();
                format!("== Log ==\n{}", lines.join("\n"))
            }
        }
    }

    /// Roster as a numbered list
    pub fn render_roster(roster: &CharacterRoster) -> String {
        if roster.is_empty() {
            return "No characters found.".to_string();
        }
        roster
            .characters()
            .iter()
            .enumerate()
            .map(|(index, character)| format!("{:>3}. {} ({})", index + 1, character.name, character.gender))
            .collect::<Vec<_>>()
            .join("\n")
    }

    // @returns: Human-readable elapsed time
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
