/*!
 * Common test utilities for the subfix test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use subfix::app_config::{GenerationConfig, ShapePolicy};
use subfix::credentials::{CredentialStore, MemoryCredentialStore};
use subfix::errors::ProviderError;
use subfix::providers::mock::MockProvider;
use subfix::providers::GenerationRequest;
use subfix::translation::prompts::{extract_embedded_text, PromptLanguages};
use subfix::translation::{BatchPipeline, GenerationService, DELIMITER};
use subfix::SessionManager;

/// Five cues with non-contiguous ids
pub const SAMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:02,000
a greets {p}

2
00:00:03,000 --> 00:00:04,500
{p} smiles

3
00:00:05,000 --> 00:00:06,000
where is {p}?
going home

5
00:00:07,000 --> 00:00:08,000
a waves

8
00:00:09,000 --> 00:00:10,000
bye
";

pub const NORMALIZE_MODEL: &str = "test-normalize";
pub const TRANSLATE_MODEL: &str = "test-translate";
pub const FIX_MODEL: &str = "test-fix";

/// Route test logs through env_logger; safe to call repeatedly
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Generation settings with one distinct model id per task
pub fn test_generation_config() -> GenerationConfig {
    GenerationConfig {
        normalize_model: NORMALIZE_MODEL.to_string(),
        translate_model: TRANSLATE_MODEL.to_string(),
        fix_model: FIX_MODEL.to_string(),
        ..GenerationConfig::default()
    }
}

/// Apply `f` to every segment of the batch embedded in a request
pub fn map_segments(request: &GenerationRequest, f: impl Fn(&str) -> String) -> String {
    let text = extract_embedded_text(&request.prompt).unwrap_or_default();
    text.split(DELIMITER).map(f).collect::<Vec<_>>().join(DELIMITER)
}

/// Deterministic stand-in for the generation service:
/// normalize uppercases, translate prefixes `VI:`, analysis proposes `A`,
/// and the fix replaces the pronoun placeholder according to the roster.
pub fn scripted_reply(request: &GenerationRequest) -> Result<String, ProviderError> {
    match request.model.as_str() {
        NORMALIZE_MODEL => Ok(map_segments(request, |s| s.to_uppercase())),
        TRANSLATE_MODEL => Ok(map_segments(request, |s| format!("VI:{}", s))),
        FIX_MODEL if request.prompt.contains("List every named character") => {
            Ok("```json\n{\"characters\":[{\"name\":\"A\",\"gender\":\"Unknown\"}]}\n```".to_string())
        }
        FIX_MODEL => {
            let pronoun = if request.prompt.contains(r#""gender":"Male""#) { "HE" } else { "THEY" };
            Ok(map_segments(request, |s| s.replace("{P}", pronoun)))
        }
        other => Err(ProviderError::ApiError {
            status_code: 404,
            message: format!("unknown model {}", other),
        }),
    }
}

/// A session manager over a mock provider and an in-memory key store
pub fn create_manager(provider: MockProvider, store: Arc<dyn CredentialStore>, batch_size: usize) -> SessionManager {
    let service = GenerationService::new(Arc::new(provider), test_generation_config(), PromptLanguages::default());
    SessionManager::new(service, BatchPipeline::new(batch_size, ShapePolicy::Lenient), store, "vi")
}

/// A key store holding a test key
pub fn key_store() -> Arc<MemoryCredentialStore> {
    Arc::new(MemoryCredentialStore::with_value("test-key-0001"))
}
