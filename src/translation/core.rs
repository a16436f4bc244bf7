/*!
 * Core generation service implementation.
 *
 * This module contains the GenerationService struct, which wraps a provider,
 * picks the configured model per task, and turns provider failures into the
 * domain error taxonomy. Callers never see transport errors.
 */

use log::{debug, error, info};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::{Config, GenerationConfig, GenerationTask};
use crate::credentials::mask_credential;
use crate::errors::GenerationError;
use crate::providers::gemini::Gemini;
use crate::providers::{GenerationRequest, Provider};

use super::characters::CharacterRoster;
use super::prompts::{self, PromptLanguages};

/// Outcome of an API key check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialCheck {
    /// Whether the key can be used right now
    pub valid: bool,
    /// Message for the user
    pub message: String,
}

impl CredentialCheck {
    fn valid(message: impl Into<String>) -> Self {
        Self { valid: true, message: message.into() }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self { valid: false, message: message.into() }
    }
}

/// Generation service for the subtitle passes
#[derive(Debug, Clone)]
pub struct GenerationService {
    /// Provider that performs the calls
    provider: Arc<dyn Provider>,

    /// Models, endpoint and timeout
    config: GenerationConfig,

    /// Language pair rendered into prompts
    languages: PromptLanguages,
}

impl GenerationService {
    /// Create a service over an explicit provider
    pub fn new(provider: Arc<dyn Provider>, config: GenerationConfig, languages: PromptLanguages) -> Self {
        Self { provider, config, languages }
    }

    /// Create a Gemini-backed service from the application config
    pub fn from_config(config: &Config) -> Self {
        let provider = Gemini::new(&config.generation.endpoint, config.generation.timeout_secs);
        Self::new(
            Arc::new(provider),
            config.generation.clone(),
            PromptLanguages::from_codes(&config.source_language, &config.target_language),
        )
    }

    /// Send one prompt and return the generated text
    pub async fn generate(&self, credential: &str, model: &str, prompt: String) -> Result<String, GenerationError> {
        self.send(GenerationRequest::new(credential, model, prompt)).await
    }

    async fn send(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        if request.credential.trim().is_empty() {
            return Err(GenerationError::MissingCredential);
        }

        debug!(
            "Calling {} model {} with key {} ({} prompt chars)",
            self.provider.name(),
            request.model,
            mask_credential(&request.credential),
            request.prompt.chars().count()
        );
        let start = Instant::now();

        match self.provider.complete(request).await {
            Ok(text) => {
                debug!("Generation finished in {:.2}s", start.elapsed().as_secs_f64());
                Ok(text)
            }
            Err(provider_error) => {
                error!("Generation failed: {}", provider_error);
                Err(GenerationError::from(provider_error))
            }
        }
    }

    async fn generate_for(&self, task: GenerationTask, credential: &str, prompt: String) -> Result<String, GenerationError> {
        self.generate(credential, self.config.model_for(task), prompt).await
    }

    /// Check whether a key works with a minimal probe request
    ///
    /// Never fails; every outcome is turned into a verdict.
    pub async fn check_credential(&self, credential: &str) -> CredentialCheck {
        let credential = credential.trim();
        if credential.is_empty() {
            return CredentialCheck::invalid("API key must not be empty.");
        }

        let request = GenerationRequest::probe(credential, self.config.model_for(GenerationTask::Probe));
        match self.send(request).await {
            Ok(_) => {
                info!("API key {} is valid", mask_credential(credential));
                CredentialCheck::valid("API key is valid and working.")
            }
            Err(GenerationError::InvalidCredential(_)) => {
                CredentialCheck::invalid("API key is not valid. Please check it and try again.")
            }
            Err(GenerationError::QuotaExceeded(_)) => {
                CredentialCheck::invalid("API key is valid, but its usage quota has been reached.")
            }
            Err(GenerationError::MissingCredential) => CredentialCheck::invalid("API key must not be empty."),
            Err(other) => CredentialCheck::invalid(format!("Error while checking the API key: {}", other)),
        }
    }

    /// Extract the character roster from the whole translated text
    pub async fn analyze_characters(&self, credential: &str, text: &str) -> Result<CharacterRoster, GenerationError> {
        let prompt = prompts::character_analysis_prompt(text, &self.languages);
        let response = self.generate_for(GenerationTask::AnalyzeCharacters, credential, prompt).await?;
        let roster = CharacterRoster::from_response(&response)?;

        info!("Character analysis found {} characters", roster.len());
        Ok(roster)
    }

    /// Normalize one delimiter-joined batch of source text
    pub async fn normalize_text(&self, credential: &str, batch_text: &str) -> Result<String, GenerationError> {
        let prompt = prompts::normalization_prompt(batch_text, &self.languages);
        self.generate_for(GenerationTask::Normalize, credential, prompt).await
    }

    /// Translate one delimiter-joined batch
    pub async fn translate_text(&self, credential: &str, batch_text: &str) -> Result<String, GenerationError> {
        let prompt = prompts::translation_prompt(batch_text, &self.languages);
        self.generate_for(GenerationTask::Translate, credential, prompt).await
    }

    /// Fix gendered words in one batch against a serialized roster
    pub async fn fix_gender_in_text(
        &self,
        credential: &str,
        batch_text: &str,
        roster_json: &str,
    ) -> Result<String, GenerationError> {
        let prompt = prompts::gender_fix_prompt(batch_text, roster_json, &self.languages);
        self.generate_for(GenerationTask::FixGender, credential, prompt).await
    }
}
