//! Error type shared by the session services.
//!
//! ERROR HANDLING
//! ==============
//! Every failure in the chat core is local and recoverable: the caller (a
//! view) reports it and carries on. A rejected command never leaves partial
//! state behind, so nothing here is retryable.

use uuid::Uuid;

/// Grepable, stable code for an error, independent of its display text.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("conversation not found: {0}")]
    ConversationNotFound(Uuid),
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("invalid message: {0}")]
    InvalidMessage(&'static str),
    #[error("unsupported file: {0}")]
    UnsupportedFile(String),
    #[error("user {got} is not the current candidate (expected {expected:?})")]
    NotCurrentCandidate { expected: Option<Uuid>, got: Uuid },
    #[error("session closed")]
    SessionClosed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConversationNotFound(_) => "E_CONVERSATION_NOT_FOUND",
            Self::UserNotFound(_) => "E_USER_NOT_FOUND",
            Self::InvalidMessage(_) => "E_INVALID_MESSAGE",
            Self::UnsupportedFile(_) => "E_UNSUPPORTED_FILE",
            Self::NotCurrentCandidate { .. } => "E_NOT_CURRENT_CANDIDATE",
            Self::SessionClosed => "E_SESSION_CLOSED",
            Self::Io(_) => "E_IO",
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
