//! Active selection — which conversation the chat view shows.
//!
//! DESIGN
//! ======
//! Holds at most one conversation ID, validated against the registry on
//! every `select`. Conversations are never removed, so a stored ID can't go
//! stale. Reading with nothing selected yields `ActiveView::Empty`, which
//! views render as a placeholder rather than an error.

use serde::Serialize;
use uuid::Uuid;

use crate::error::ChatError;
use crate::services::conversation::ConversationRegistry;
use crate::state::{Message, User};

pub const NO_SELECTION_PLACEHOLDER: &str = "Select a conversation or start swiping to match!";

/// What the chat window should render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ActiveView {
    Empty,
    Conversation {
        conversation_id: Uuid,
        /// `None` if the counterpart isn't a known profile.
        user: Option<User>,
        messages: Vec<Message>,
    },
}

impl ActiveView {
    /// Placeholder line for views with nothing to show, `None` when there
    /// are messages to render.
    #[must_use]
    pub fn placeholder(&self) -> Option<String> {
        match self {
            Self::Empty => Some(NO_SELECTION_PLACEHOLDER.to_owned()),
            Self::Conversation { user, messages, .. } if messages.is_empty() => {
                let name = user.as_ref().map_or("your match", |u| u.name.as_str());
                Some(format!("Say hello to {name}!"))
            }
            Self::Conversation { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveSelection {
    current: Option<Uuid>,
}

impl ActiveSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> Option<Uuid> {
        self.current
    }

    /// Select `conversation_id` if the registry knows it.
    ///
    /// # Errors
    ///
    /// Returns `ConversationNotFound` and keeps the previous selection when
    /// the ID is unknown.
    pub fn select(&mut self, conversation_id: Uuid, registry: &ConversationRegistry) -> Result<(), ChatError> {
        if !registry.contains(conversation_id) {
            return Err(ChatError::ConversationNotFound(conversation_id));
        }
        self.current = Some(conversation_id);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Snapshot of the selected thread, or `ActiveView::Empty`.
    pub fn view<'a, F>(&self, registry: &ConversationRegistry, lookup: F) -> ActiveView
    where
        F: Fn(Uuid) -> Option<&'a User>,
    {
        let Some(conversation) = self.current.and_then(|id| registry.conversation(id)) else {
            return ActiveView::Empty;
        };
        ActiveView::Conversation {
            conversation_id: conversation.id,
            user: lookup(conversation.user_id).cloned(),
            messages: conversation.messages().to_vec(),
        }
    }
}

#[cfg(test)]
#[path = "selection_test.rs"]
mod tests;
