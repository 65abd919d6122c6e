pub mod openai;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Failure of a single completion call.
///
/// `Transient` failures are retried by the batch loop while attempts remain;
/// `Fatal` ones stop the run at once.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("transient model failure: {0}")]
    Transient(String),
    #[error("model failure: {0}")]
    Fatal(String),
}

impl ModelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// A chat model that answers with a JSON value.
pub trait ChatModel {
    fn model(&self) -> &str;

    fn complete(&mut self, messages: &[ChatMessage]) -> Result<Value, ModelError>;
}

impl<M: ChatModel + ?Sized> ChatModel for Box<M> {
    fn model(&self) -> &str {
        (**self).model()
    }

    fn complete(&mut self, messages: &[ChatMessage]) -> Result<Value, ModelError> {
        (**self).complete(messages)
    }
}
