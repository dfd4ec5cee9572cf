//! Generation backend abstraction
//!
//! Every operation is a single round trip and reports failure as a value.
//! Callers branch on `Result`, they never need to catch anything.

use thiserror::Error;

use crate::models::{Storyboard, StoryboardRequest, SuggestionKind};

/// Why a generation request produced nothing usable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("API key is not set. Please provide a valid API key.")]
    MissingCredential,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Could not parse response: {0}")]
    Parse(String),

    #[error("The model returned no content")]
    EmptyResponse,
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::Transport("request timed out".to_string())
        } else if e.is_connect() {
            GenerationError::Transport(format!("connection failed: {}", e))
        } else if e.is_decode() {
            GenerationError::Parse(e.to_string())
        } else {
            GenerationError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(e: serde_json::Error) -> Self {
        GenerationError::Parse(e.to_string())
    }
}

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Anything able to brainstorm, write storyboards and draw single images
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short free-text suggestion of the given kind for `current_idea`
    async fn suggest_idea(
        &self,
        credential: &str,
        current_idea: &str,
        kind: SuggestionKind,
    ) -> GenerationResult<String>;

    /// Structured storyboard, already normalized to six panels
    async fn generate_storyboard(
        &self,
        credential: &str,
        request: &StoryboardRequest,
    ) -> GenerationResult<Storyboard>;

    /// One square image for `prompt`, base64 encoded
    async fn generate_image(&self, credential: &str, prompt: &str) -> GenerationResult<String>;
}

/// Reject blank credentials before any I/O happens
pub fn require_credential(credential: &str) -> GenerationResult<&str> {
    let trimmed = credential.trim();
    if trimmed.is_empty() {
        Err(GenerationError::MissingCredential)
    } else {
        Ok(trimmed)
    }
}
