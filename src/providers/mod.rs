/*!
 * Provider implementations for text generation services.
 *
 * This module contains client implementations behind a common trait:
 * - Gemini: Google Generative Language REST API
 * - Mock: scripted provider for tests and offline runs
 */

use async_trait::async_trait;
use std::fmt::{self, Debug};

use crate::credentials::mask_credential;
use crate::errors::ProviderError;

/// A single prompt-in, text-out request
#[derive(Clone)]
pub struct GenerationRequest {
    /// API key the call is authorized with
    pub credential: String,

    /// Model identifier
    pub model: String,

    /// Full prompt text
    pub prompt: String,

    /// Upper bound on generated tokens
    pub max_output_tokens: Option<u32>,

    /// Reasoning budget; `Some(0)` disables thinking on models that support it
    pub thinking_budget: Option<u32>,
}

impl GenerationRequest {
    /// Create a new request
    pub fn new(credential: impl Into<String>, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            model: model.into(),
            prompt: prompt.into(),
            max_output_tokens: None,
            thinking_budget: None,
        }
    }

    /// Cheapest possible request, used to check that a key works
    pub fn probe(credential: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(credential, model, "hi")
            .max_output_tokens(1)
            .thinking_budget(0)
    }

    /// Set the output token limit
    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Set the thinking budget
    pub fn thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }
}

impl Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("credential", &mask_credential(&self.credential))
            .field("model", &self.model)
            .field("prompt_chars", &self.prompt.chars().count())
            .field("max_output_tokens", &self.max_output_tokens)
            .field("thinking_budget", &self.thinking_budget)
            .finish()
    }
}

/// Common trait for all generation providers
///
/// Implementations report transport and API failures as `ProviderError`;
/// classification into domain errors happens in the generation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request, returning the trimmed generated text
    async fn complete(&self, request: GenerationRequest) -> Result<String, ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}

pub mod gemini;
pub mod mock;
