/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::echo()` - Returns the text embedded in the prompt unchanged
 * - `MockProvider::with_responder(..)` - Computes the reply with a closure
 * - `MockProvider::failing(..)` - Always fails with the given error
 * - `MockProvider::fail_on_call(..)` - Fails only on the Nth request
 *
 * Every request is recorded so tests can inspect prompts and credentials.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{GenerationRequest, Provider};
use crate::translation::prompts::extract_embedded_text;

/// Closure computing a reply for a request
pub type Responder = Arc<dyn Fn(&GenerationRequest) -> Result<String, ProviderError> + Send + Sync>;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails only on the given 1-based request number
    FailOnCall { call: usize, error: ProviderError },
    /// Always fails with an error
    Failing(ProviderError),
}

/// Mock provider for testing generation behavior
#[derive(Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, shared between clones
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    /// Custom reply generator; echoes the embedded text when absent
    responder: Option<Responder>,
    /// Artificial latency per request
    delay_ms: u64,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            responder: None,
            delay_ms: 0,
        }
    }

    /// A working provider that echoes the embedded text
    pub fn echo() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// A working provider whose replies come from the closure
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        let mut provider = Self::echo();
        provider.responder = Some(Arc::new(responder));
        provider
    }

    /// A provider that always fails
    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    /// A provider that fails on the given 1-based request number only
    pub fn fail_on_call(call: usize, error: ProviderError) -> Self {
        Self::new(MockBehavior::FailOnCall { call, error })
    }

    /// Replace the behavior, keeping any responder
    pub fn behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Add a fixed latency to every request
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of all requests received so far
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    // @returns: Reply for a successful request
    fn reply(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        match &self.responder {
            Some(responder) => responder(request),
            None => Ok(extract_embedded_text(&request.prompt)
                .unwrap_or(&request.prompt)
                .to_string()),
        }
    }
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProvider")
            .field("behavior", &self.behavior)
            .field("request_count", &self.request_count())
            .field("has_responder", &self.responder.is_some())
            .finish()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        let call = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(request.clone());

        if self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }

        match &self.behavior {
            MockBehavior::Working => self.reply(&request),
            MockBehavior::FailOnCall { call: failing_call, error } => {
                if call == *failing_call {
                    Err(error.clone())
                } else {
                    self.reply(&request)
                }
            }
            MockBehavior::Failing(error) => Err(error.clone()),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
