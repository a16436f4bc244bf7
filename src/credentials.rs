/*!
 * API key persistence.
 *
 * The key is read from a `CredentialStore` at the start of every operation
 * that needs it. Stores are plain key-value persistence with no encryption.
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::path::PathBuf;

use crate::file_utils::FileManager;

/// Key under which the API key is stored
pub const CREDENTIAL_KEY: &str = "gemini_api_key";

/// Get/set access to the persisted API key
pub trait CredentialStore: Send + Sync + Debug {
    /// Current key, `None` when unset or empty
    fn get(&self) -> Option<String>;

    /// Replace the stored key
    fn set(&self, value: &str) -> Result<()>;
}

/// In-process store, used by tests and as a fallback
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    value: RwLock<String>,
}

impl MemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given key
    pub fn with_value(value: &str) -> Self {
        Self {
            value: RwLock::new(value.to_string()),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        let value = self.value.read();
        if value.is_empty() { None } else { Some(value.clone()) }
    }

    fn set(&self, value: &str) -> Result<()> {
        *self.value.write() = value.to_string();
        Ok(())
    }
}

/// JSON key-value file store
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store backed by the given file (created on first `set`)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the user's config directory
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir().context("Could not determine the user config directory")?;
        Ok(Self::new(dir.join("subfix").join("store.json")))
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        if !FileManager::file_exists(&self.path) {
            return Ok(Map::new());
        }
        let content = FileManager::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse credential store: {:?}", self.path))
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<String> {
        match self.read_map() {
            Ok(map) => map
                .get(CREDENTIAL_KEY)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            Err(e) => {
                debug!("Credential store unreadable: {}", e);
                None
            }
        }
    }

    fn set(&self, value: &str) -> Result<()> {
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(e) => {
                warn!("Credential store unreadable, rewriting {:?}: {}", self.path, e);
                Map::new()
            }
        };
        map.insert(CREDENTIAL_KEY.to_string(), Value::String(value.to_string()));
        let content = serde_json::to_string_pretty(&map)?;
        FileManager::write_to_file(&self.path, &content)
    }
}

/// Masked form of a key for logs: first and last four characters only
pub fn mask_credential(credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}
