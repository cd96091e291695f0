//! Completion provider boundary.
//!
//! The rest of the application talks to the language model only through
//! [`CompletionProvider`]; the OpenAI client in [`openai`] is the one real
//! implementation, and tests substitute fakes.

pub mod openai;
pub mod sources;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }

    /// Coerce a stored role string. Anything that is not an assistant turn
    /// is treated as a user turn.
    pub fn from_db(role: &str) -> Self {
        if role == "assistant" {
            TurnRole::Assistant
        } else {
            TurnRole::User
        }
    }
}

/// One `{role, text}` turn of provider input.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
}

/// Input to a completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Fixed system instruction, already assembled by the caller.
    pub system_prompt: String,
    /// Ordered history, oldest first, ending with the newest user turn.
    pub turns: Vec<ChatTurn>,
    /// When false the provider must receive no search capability at all.
    pub web_search: bool,
}

/// Outcome of a completion call.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Reply text; `None` when the provider produced no usable text.
    pub text: Option<String>,
    /// Raw citation list in provider order, not yet deduplicated.
    pub sources: Vec<Source>,
}

/// A web citation attached to an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Completion provider errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("provider response could not be decoded: {0}")]
    Decode(String),
}

/// A black-box completion function: prompt + conversation → text + sources.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError>;
}
