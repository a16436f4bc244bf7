use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{is_invalid_key_message, ProviderError};
use super::{GenerationRequest, Provider};

/// Gemini client for the Generative Language REST API
#[derive(Debug)]
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// API base URL
    endpoint: String,
}

/// Body of a `generateContent` call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns; a single user turn here
    contents: Vec<Content>,

    /// Sampling and budget settings
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfigBody>,
}

/// A turn in the conversation
#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    /// Author role (user, model)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Content parts
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single text part
#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    /// Text of the part
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

/// Successful `generateContent` response
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    /// Generated candidates
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// A generated candidate
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Candidate content (absent when generation was blocked)
    #[serde(default)]
    pub content: Option<Content>,

    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Error envelope returned by the API
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GenerateContentRequest {
    /// Build the API body from a generation request
    pub fn from_request(request: &GenerationRequest) -> Self {
        let generation_config = if request.max_output_tokens.is_some() || request.thinking_budget.is_some() {
            Some(GenerationConfigBody {
                max_output_tokens: request.max_output_tokens,
                thinking_config: request.thinking_budget.map(|thinking_budget| ThinkingConfig { thinking_budget }),
            })
        } else {
            None
        };

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(request.prompt.clone()) }],
            }],
            generation_config,
        }
    }
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|e| {
                    warn!("Failed to build HTTP client with a {}s timeout, using defaults: {}", timeout_secs, e);
                    Client::new()
                }),
            endpoint: endpoint.into(),
        }
    }

    // @returns: Full generateContent URL for a model
    fn api_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            model
        )
    }

    /// Extract text from a response, joining all text parts of the first candidate
    pub fn extract_text_from_response(response: &GenerateContentResponse) -> Result<String, ProviderError> {
        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| ProviderError::ParseError("response contained no candidates".to_string()))?;

        let text: String = candidate
            .content
            .as_ref()
            .map(|content| content.parts.iter().filter_map(|part| part.text.as_deref()).collect())
            .unwrap_or_default();

        if text.is_empty() {
            debug!("Empty candidate text (finish reason: {:?})", candidate.finish_reason);
        }

        Ok(text.trim().to_string())
    }

    /// Map a non-success HTTP answer onto a provider error
    pub fn classify_error(status: StatusCode, body: &str) -> ProviderError {
        let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => (envelope.error.message, envelope.error.status),
            Err(_) => (body.to_string(), String::new()),
        };

        if status == StatusCode::TOO_MANY_REQUESTS || api_status == "RESOURCE_EXHAUSTED" {
            return ProviderError::RateLimitExceeded(message);
        }

        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || is_invalid_key_message(&message)
            || is_invalid_key_message(body)
        {
            return ProviderError::AuthenticationError(message);
        }

        ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl Provider for Gemini {
    async fn complete(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        let body = GenerateContentRequest::from_request(&request);

        let response = self.client.post(self.api_url(&request.model))
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &request.credential)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        let response_text = response.text().await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            error!("Gemini API error ({}): {}", status, response_text);
            return Err(Self::classify_error(status, &response_text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&response_text)
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Self::extract_text_from_response(&parsed)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
