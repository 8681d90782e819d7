//! Mock profiles and pre-seeded conversations.
//!
//! DESIGN
//! ======
//! A session starts from a `Seed`: the candidate deck plus any
//! conversations that exist before the first swipe. Seeds come from the
//! built-in mock data or a JSON file. The file format refers to users by
//! position or by ID so hand-written seeds don't need UUIDs:
//!
//! ```json
//! { "users": [{ "name": "Mia", "age": 25, "images": ["a.jpg"] }],
//!   "conversations": [{ "user": 0, "messages": [{ "sender": "system", "text": "Hi" }] }] }
//! ```
//!
//! ERROR HANDLING
//! ==============
//! Every reference and message is checked while loading, so a session never
//! starts with a dangling counterpart or a message violating the
//! text-or-image rule.

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::{Conversation, Message, Sender, User};

pub const WELCOME_MESSAGE: &str = "Welcome to Bumble Chat! How can I help you today?";

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("conversation references unknown user {0}")]
    UnknownUser(String),
    #[error("invalid seeded message in conversation with {user}: {source}")]
    InvalidMessage {
        user: String,
        #[source]
        source: crate::error::ChatError,
    },
}

// =============================================================================
// FILE FORMAT
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedFile {
    pub users: Vec<User>,
    #[serde(default)]
    pub conversations: Vec<SeedConversation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConversation {
    pub user: UserRef,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// A user named by deck position or by ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Index(usize),
    Id(Uuid),
}

// =============================================================================
// SEED
// =============================================================================

/// Validated starting state for a session. Only the constructors below can
/// add conversations, so every counterpart is in the deck.
#[derive(Debug, Clone, Default)]
pub struct Seed {
    users: Vec<User>,
    conversations: Vec<Conversation>,
}

impl Seed {
    /// Deck only, no conversations.
    #[must_use]
    pub fn new(users: Vec<User>) -> Self {
        Self { users, conversations: Vec::new() }
    }

    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Bypass the constructors; lets tests hand the session a bad seed.
    #[cfg(test)]
    pub(crate) fn unchecked(users: Vec<User>, conversations: Vec<Conversation>) -> Self {
        Self { users, conversations }
    }

    pub(crate) fn into_parts(self) -> (Vec<User>, Vec<Conversation>) {
        (self.users, self.conversations)
    }

    /// Add a pre-seeded conversation with `user`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownUser` if the reference doesn't resolve and
    /// `InvalidMessage` if a message has neither text nor image.
    pub fn with_conversation(mut self, user: UserRef, messages: Vec<Message>) -> Result<Self, SeedError> {
        let counterpart = match user {
            UserRef::Index(i) => self.users.get(i),
            UserRef::Id(id) => self.users.iter().find(|u| u.id == id),
        }
        .ok_or_else(|| SeedError::UnknownUser(format!("{user:?}")))?;

        let mut conversation = Conversation::new(counterpart.id);
        for message in messages {
            conversation
                .push(message)
                .map_err(|source| SeedError::InvalidMessage { user: counterpart.name.clone(), source })?;
        }
        self.conversations.push(conversation);
        Ok(self)
    }

    /// Resolve and validate a parsed seed file.
    ///
    /// # Errors
    ///
    /// See [`Seed::with_conversation`].
    pub fn from_file(file: SeedFile) -> Result<Self, SeedError> {
        file.conversations
            .into_iter()
            .try_fold(Self::new(file.users), |seed, c| seed.with_conversation(c.user, c.messages))
    }

    /// Parse a JSON seed.
    ///
    /// # Errors
    ///
    /// Returns `Parse` for malformed JSON, otherwise see [`Seed::from_file`].
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Self::from_file(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON seed file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file can't be read, otherwise see [`Seed::from_json`].
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Built-in mock deck with a welcome thread from the first profile.
    #[must_use]
    pub fn builtin() -> Self {
        let users = vec![
            User::new(
                "Sophia",
                28,
                "Coffee enthusiast, hiking lover, and amateur photographer.",
                vec![
                    "https://randomuser.me/api/portraits/women/44.jpg".into(),
                    "https://randomuser.me/api/portraits/women/45.jpg".into(),
                ],
            ),
            User::new(
                "Emma",
                26,
                "Foodie and travel addict. Let's explore the city together!",
                vec![
                    "https://randomuser.me/api/portraits/women/65.jpg".into(),
                    "https://randomuser.me/api/portraits/women/66.jpg".into(),
                    "https://randomuser.me/api/portraits/women/67.jpg".into(),
                ],
            ),
            User::new(
                "Olivia",
                30,
                "Bookworm by day, salsa dancer by night.",
                vec!["https://randomuser.me/api/portraits/women/68.jpg".into()],
            ),
            User::new(
                "Ava",
                27,
                "Dog mom. Ask me about my golden retriever.",
                vec![
                    "https://randomuser.me/api/portraits/women/12.jpg".into(),
                    "https://randomuser.me/api/portraits/women/13.jpg".into(),
                ],
            ),
        ];

        let welcome = Message {
            id: Uuid::new_v4(),
            sender: Sender::System,
            text: Some(WELCOME_MESSAGE.to_owned()),
            image: None,
            timestamp: "10:30 AM".to_owned(),
        };

        let mut seed = Self::new(users);
        let mut conversation = Conversation::new(seed.users[0].id);
        if conversation.push(welcome).is_ok() {
            seed.conversations.push(conversation);
        }
        seed
    }
}

#[cfg(test)]
#[path = "seed_test.rs"]
mod tests;
