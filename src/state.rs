//! Session data model.
//!
//! DESIGN
//! ======
//! Users are immutable profiles for the lifetime of a session. Messages are
//! owned by exactly one `Conversation` and only ever appended; the message
//! vector is private so the append-only rule holds outside this module too.
//! Insertion order is display order; timestamps are display strings only.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;
use uuid::Uuid;

use crate::error::ChatError;

// =============================================================================
// USER
// =============================================================================

/// A candidate / counterpart profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub age: u8,
    #[serde(default)]
    pub bio: String,
    /// Image references in display order. May be empty.
    #[serde(default)]
    pub images: Vec<String>,
}

impl User {
    #[must_use]
    pub fn new(name: impl Into<String>, age: u8, bio: impl Into<String>, images: Vec<String>) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), age, bio: bio.into(), images }
    }

    /// First image, used as the avatar in lists and headers.
    #[must_use]
    pub fn avatar(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The local user.
    Me,
    Counterpart,
    System,
}

/// A single chat message. At least one of `text` / `image` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default = "now_timestamp")]
    pub timestamp: String,
}

impl Message {
    /// Build a text message stamped with the current local time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if `text` is empty after trimming.
    pub fn text(sender: Sender, text: impl Into<String>) -> Result<Self, ChatError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ChatError::InvalidMessage("text is empty"));
        }
        Ok(Self { id: Uuid::new_v4(), sender, text: Some(text), image: None, timestamp: now_timestamp() })
    }

    /// Build an image message stamped with the current local time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if `image` is empty.
    pub fn image(sender: Sender, image: impl Into<String>) -> Result<Self, ChatError> {
        let image = image.into();
        if image.is_empty() {
            return Err(ChatError::InvalidMessage("image reference is empty"));
        }
        Ok(Self { id: Uuid::new_v4(), sender, text: None, image: Some(image), timestamp: now_timestamp() })
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Check the text-or-image invariant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` when neither a non-empty text nor an image is set.
    pub fn validate(&self) -> Result<(), ChatError> {
        let has_text = self.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_image = self.image.as_deref().is_some_and(|i| !i.is_empty());
        if has_text || has_image {
            Ok(())
        } else {
            Err(ChatError::InvalidMessage("message needs text or an image"))
        }
    }
}

/// Format an instant the way the chat bubbles show it, e.g. `10:30 AM`.
#[must_use]
pub fn display_timestamp(at: OffsetDateTime) -> String {
    at.format(format_description!("[hour repr:12]:[minute] [period]"))
        .unwrap_or_default()
}

/// Current local time as a display timestamp. Falls back to UTC when the
/// local offset can't be determined.
#[must_use]
pub fn now_timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    display_timestamp(now)
}

// =============================================================================
// CONVERSATION
// =============================================================================

/// Message thread between the local user and one counterpart.
///
/// Only built through [`Conversation::new`] plus validated appends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub id: Uuid,
    /// Counterpart user.
    pub user_id: Uuid,
    messages: Vec<Message>,
}

impl Conversation {
    #[must_use]
    pub fn new(user_id: Uuid) -> Self {
        Self { id: Uuid::new_v4(), user_id, messages: Vec::new() }
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a message, returning the new thread length.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if the message has neither text nor image.
    pub(crate) fn push(&mut self, message: Message) -> Result<usize, ChatError> {
        message.validate()?;
        self.messages.push(message);
        Ok(self.messages.len())
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
