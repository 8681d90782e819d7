//! Conversation registry — per-counterpart message threads.
//!
//! DESIGN
//! ======
//! Conversations are keyed by ID and also indexed by counterpart so a
//! repeated match reuses the existing thread instead of creating a second
//! one. Creation order is remembered separately because it is the order the
//! conversation list renders in. Conversations are never removed.
//!
//! ERROR HANDLING
//! ==============
//! Appends are validated before anything is written: an unknown ID or a
//! message without text or image is rejected and the thread is unchanged.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::error::ChatError;
use crate::state::{Conversation, Message, Sender, User};

pub const EMPTY_PREVIEW: &str = "Start a conversation!";
pub const IMAGE_PREVIEW: &str = "[image]";

// =============================================================================
// TYPES
// =============================================================================

/// One row of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    /// `None` when the counterpart isn't a known profile.
    pub user_name: Option<String>,
    pub avatar: Option<String>,
    pub preview: String,
    /// Timestamp of the last message, if any.
    pub timestamp: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationRegistry {
    conversations: HashMap<Uuid, Conversation>,
    /// Conversation IDs in creation order.
    order: Vec<Uuid>,
    /// Counterpart user ID -> conversation ID.
    by_user: HashMap<Uuid, Uuid>,
}

// =============================================================================
// REGISTRY
// =============================================================================

impl ConversationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-built conversation. If the counterpart already has a
    /// thread the existing ID is returned and `conversation` is dropped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if any message has neither text nor image.
    /// Nothing is registered in that case.
    pub fn insert(&mut self, conversation: Conversation) -> Result<Uuid, ChatError> {
        if let Some(existing) = self.for_user(conversation.user_id) {
            return Ok(existing);
        }
        conversation.messages().iter().try_for_each(Message::validate)?;
        Ok(self.register(conversation))
    }

    /// Create-or-reuse the conversation with `user_id`.
    ///
    /// Returns the conversation ID and whether it was newly created.
    pub fn open_for_user(&mut self, user_id: Uuid) -> (Uuid, bool) {
        match self.for_user(user_id) {
            Some(existing) => (existing, false),
            None => (self.register(Conversation::new(user_id)), true),
        }
    }

    fn register(&mut self, conversation: Conversation) -> Uuid {
        let id = conversation.id;
        self.by_user.insert(conversation.user_id, id);
        self.order.push(id);
        self.conversations.insert(id, conversation);
        id
    }

    /// Append `message` to the end of a thread and return the new length.
    ///
    /// # Errors
    ///
    /// Returns `ConversationNotFound` for an unknown ID and `InvalidMessage`
    /// if the message has neither text nor image.
    pub fn append(&mut self, conversation_id: Uuid, message: Message) -> Result<usize, ChatError> {
        let conversation = self
            .conversations
            .get_mut(&conversation_id)
            .ok_or(ChatError::ConversationNotFound(conversation_id))?;
        conversation.push(message)
    }

    /// Ordered, read-only view of a thread.
    ///
    /// # Errors
    ///
    /// Returns `ConversationNotFound` for an unknown ID.
    pub fn get(&self, conversation_id: Uuid) -> Result<&[Message], ChatError> {
        self.conversations
            .get(&conversation_id)
            .map(Conversation::messages)
            .ok_or(ChatError::ConversationNotFound(conversation_id))
    }

    #[must_use]
    pub fn conversation(&self, conversation_id: Uuid) -> Option<&Conversation> {
        self.conversations.get(&conversation_id)
    }

    #[must_use]
    pub fn for_user(&self, user_id: Uuid) -> Option<Uuid> {
        self.by_user.get(&user_id).copied()
    }

    #[must_use]
    pub fn contains(&self, conversation_id: Uuid) -> bool {
        self.conversations.contains_key(&conversation_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Conversations in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.order.iter().filter_map(|id| self.conversations.get(id))
    }

    /// Conversation list rows in creation order.
    pub fn summaries<'a, F>(&self, active: Option<Uuid>, lookup: F) -> Vec<ConversationSummary>
    where
        F: Fn(Uuid) -> Option<&'a User>,
    {
        self.iter()
            .map(|conversation| {
                let user = lookup(conversation.user_id);
                let last = conversation.last_message();
                ConversationSummary {
                    conversation_id: conversation.id,
                    user_id: conversation.user_id,
                    user_name: user.map(|u| u.name.clone()),
                    avatar: user.and_then(User::avatar).map(str::to_owned),
                    preview: last.map_or_else(|| EMPTY_PREVIEW.to_owned(), preview_line),
                    timestamp: last.map(|m| m.timestamp.clone()),
                    active: active == Some(conversation.id),
                }
            })
            .collect()
    }
}

fn preview_line(message: &Message) -> String {
    let body = message.text.as_deref().unwrap_or(IMAGE_PREVIEW);
    if message.sender == Sender::Me { format!("You: {body}") } else { body.to_owned() }
}

#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;
