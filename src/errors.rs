/*!
 * Error types for the subfix application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

use crate::session::models::Stage;

/// Errors that can occur when talking to a generation provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Quota or rate limit exhausted
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Domain errors surfaced by the generation client.
///
/// Callers match on these instead of inspecting transport failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// No credential was available when the operation started
    #[error("No API key is set. Save an API key before processing.")]
    MissingCredential,

    /// The service rejected the credential
    #[error("The API key is not valid. Check it and save a new key: {0}")]
    InvalidCredential(String),

    /// The account quota is exhausted
    #[error("API quota exceeded. Try again later or upgrade your plan: {0}")]
    QuotaExceeded(String),

    /// The service answered with something that could not be interpreted
    #[error("Malformed response from the generation service: {0}")]
    MalformedResponse(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl From<ProviderError> for GenerationError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::RateLimitExceeded(message) => Self::QuotaExceeded(message),
            ProviderError::AuthenticationError(message) => Self::InvalidCredential(message),
            ProviderError::ApiError { status_code: 429, message } => Self::QuotaExceeded(message),
            ProviderError::ApiError { status_code: 401 | 403, message } => Self::InvalidCredential(message),
            ProviderError::ApiError { message, .. } => {
                if is_quota_message(&message) {
                    Self::QuotaExceeded(message)
                } else if is_invalid_key_message(&message) {
                    Self::InvalidCredential(message)
                } else {
                    Self::Other(message)
                }
            }
            other => Self::Other(other.to_string()),
        }
    }
}

/// Whether a raw service message signals an exhausted quota
pub fn is_quota_message(message: &str) -> bool {
    message.contains("RESOURCE_EXHAUSTED") || message.contains("429")
}

/// Whether a raw service message signals a rejected API key
pub fn is_invalid_key_message(message: &str) -> bool {
    message.to_lowercase().contains("api key not valid") || message.contains("API_KEY_INVALID")
}

/// A batch run failure with the task it belonged to
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{task} failed{}: {source}", batch_suffix(.batch, .total))]
pub struct BatchError {
    /// Human-readable task name
    pub task: String,
    /// Zero-based index of the failing batch, if a batch was attempted
    pub batch: Option<usize>,
    /// Total number of batches in the run
    pub total: usize,
    /// Underlying generation error
    pub source: GenerationError,
}

fn batch_suffix(batch: &Option<usize>, total: &usize) -> String {
    match batch {
        Some(index) => format!(" at batch {}/{}", index + 1, total),
        None => String::new(),
    }
}

impl BatchError {
    /// Create a failure that happened before any batch was dispatched
    pub fn before_dispatch(task: &str, source: GenerationError) -> Self {
        Self {
            task: task.to_string(),
            batch: None,
            total: 0,
            source,
        }
    }

    /// The domain error behind this failure
    pub fn kind(&self) -> &GenerationError {
        &self.source
    }
}

/// Errors raised by the stage state machine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// No subtitle file has been loaded yet
    #[error("No subtitle file is loaded")]
    NoFileLoaded,

    /// The predecessor of a stage has not produced data yet
    #[error("Cannot run {stage}: {requires} stage has no data yet")]
    StageNotReady {
        /// The stage that was requested
        stage: Stage,
        /// The stage whose data is missing
        requires: Stage,
    },

    /// A run targeting the same stage is still in flight
    #[error("{0} is already running")]
    StageBusy(Stage),

    /// A roster operation was attempted while no review is open
    #[error("No character roster is awaiting confirmation")]
    NotAwaitingConfirmation,

    /// A roster edit named a character that does not exist
    #[error("Unknown character: {0}")]
    UnknownCharacter(String),

    /// A new file was loaded while the run was in flight
    #[error("A new file was loaded while {0} was running; the result was discarded")]
    FileChanged(Stage),

    /// Export was requested before the fix stage produced data
    #[error("There are no fixed subtitles to export yet")]
    NothingToExport,

    /// File read/write failure
    #[error("File error: {0}")]
    File(String),

    /// Error from a single generation call
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Error from a batched run
    #[error(transparent)]
    Batch(#[from] BatchError),
}

impl SessionError {
    /// The domain generation error behind this failure, if any
    pub fn generation_error(&self) -> Option<&GenerationError> {
        match self {
            Self::Generation(error) => Some(error),
            Self::Batch(error) => Some(error.kind()),
            _ => None,
        }
    }

    /// Whether the run stopped before any request was sent
    pub fn is_before_dispatch(&self) -> bool {
        match self {
            Self::Batch(error) => error.batch.is_none(),
            Self::Generation(GenerationError::MissingCredential) => true,
            Self::NoFileLoaded | Self::StageNotReady { .. } | Self::StageBusy(_) => true,
            _ => false,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the session
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
