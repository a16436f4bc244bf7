// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use subfix::app_config::{self, Config};
use subfix::app_controller::Controller;
use subfix::credentials::{CredentialStore, FileCredentialStore};
use subfix::translation::GenerationService;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an interactive session (default command)
    Session {
        /// Subtitle file to load on start
        #[arg(value_name = "SRT_FILE")]
        file: Option<PathBuf>,
    },

    /// Check an API key and exit
    CheckKey {
        /// Key to check; the saved key is used when omitted
        key: Option<String>,
    },

    /// Generate shell completions for subfix
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subfix - AI subtitle normalizer, translator and gender fixer
#[derive(Parser, Debug)]
#[command(name = "subfix")]
#[command(version)]
#[command(about = "Normalize, translate and fix gender in subtitles with Gemini")]
#[command(long_about = "subfix loads an SRT file and runs it through normalization, translation and
gender-consistency passes. Each pass is started by a command in the interactive
session, and the character list is confirmed by hand before the gender fix.

EXAMPLES:
    subfix                                  # Start an interactive session
    subfix session movie.zh.srt             # Start a session with a file loaded
    subfix check-key                        # Check the saved API key
    subfix -b 20 -t vi session movie.srt    # Smaller batches, Vietnamese target
    subfix completions bash > subfix.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default
    one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Source language code (e.g., 'zh')
    #[arg(short, long, global = true)]
    source_language: Option<String>,

    /// Target language code (e.g., 'vi')
    #[arg(short, long, global = true)]
    target_language: Option<String>,

    /// Entries per request
    #[arg(short, long, global = true)]
    batch_size: Option<usize>,

    /// Use this API key for the session without saving it
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,
}

// @struct: Custom logger; filtering follows the global max level
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color code for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at info; the configured level is applied once the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "subfix", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    match cli.command {
        Some(Commands::CheckKey { key }) => check_key(&config, key.or(cli.api_key)).await,
        Some(Commands::Session { file }) => run_session(config, cli.api_key, file).await,
        None => run_session(config, cli.api_key, None).await,
        Some(Commands::Completions { .. }) => Ok(()),
    }
}

// @returns: Config from file with CLI overrides applied and validated
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(&cli.config_path)?;

    if let Some(source_language) = &cli.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &cli.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(batch_size) = cli.batch_size {
        config.pipeline.batch_size = batch_size;
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn check_key(config: &Config, key: Option<String>) -> Result<()> {
    let key = match key {
        Some(key) => key,
        None => {
            let store = match &config.credential_store_path {
                Some(path) => FileCredentialStore::new(path),
                None => FileCredentialStore::default_location()?,
            };
            store.get().unwrap_or_default()
        }
    };

    let check = GenerationService::from_config(config).check_credential(&key).await;
    if check.valid {
        println!("OK: {}", check.message);
        Ok(())
    } else {
        Err(anyhow::anyhow!(check.message))
    }
}

async fn run_session(config: Config, api_key: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let controller = Controller::with_config(config, api_key)?;
    controller.run_interactive(file).await?;
    Ok(())
}
