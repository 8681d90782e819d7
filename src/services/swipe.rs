//! Swipe queue — cyclic candidate deck.
//!
//! DESIGN
//! ======
//! A finite, ordered deck with a cursor advanced by modular arithmetic. The
//! deck never runs out: after the last candidate the cursor wraps to the
//! first. Each profile also has its own image index, cycled independently
//! of the cursor, so returning to a profile shows the last image viewed.

use std::collections::{HashMap, HashSet};

use tracing::warn;
use uuid::Uuid;

use crate::error::ChatError;
use crate::state::User;

#[derive(Debug, Clone, Default)]
pub struct SwipeQueue {
    users: Vec<User>,
    cursor: usize,
    /// Per-user image index. Absent means 0.
    image_index: HashMap<Uuid, usize>,
}

impl SwipeQueue {
    /// Build a deck. Profiles with a duplicate ID are dropped (first wins).
    #[must_use]
    pub fn new(users: Vec<User>) -> Self {
        let mut seen = HashSet::new();
        let users = users
            .into_iter()
            .filter(|u| {
                let fresh = seen.insert(u.id);
                if !fresh {
                    warn!(user_id = %u.id, name = %u.name, "duplicate profile id in deck; skipping");
                }
                fresh
            })
            .collect();
        Self { users, cursor: 0, image_index: HashMap::new() }
    }

    /// Candidate at the cursor, `None` for an empty deck.
    #[must_use]
    pub fn current(&self) -> Option<&User> {
        self.users.get(self.cursor)
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    #[must_use]
    pub fn user(&self, user_id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Move to the next candidate, wrapping after the last. No-op when empty.
    pub fn advance(&mut self) {
        if !self.users.is_empty() {
            self.cursor = (self.cursor + 1) % self.users.len();
        }
    }

    /// Like the current candidate and advance. Returns the liked user's ID;
    /// the caller turns it into a match.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for an unknown ID and `NotCurrentCandidate`
    /// when `user_id` is known but not at the cursor. The cursor is unchanged
    /// on error.
    pub fn like(&mut self, user_id: Uuid) -> Result<Uuid, ChatError> {
        if self.user(user_id).is_none() {
            return Err(ChatError::UserNotFound(user_id));
        }
        let expected = self.current().map(|u| u.id);
        if expected != Some(user_id) {
            return Err(ChatError::NotCurrentCandidate { expected, got: user_id });
        }
        self.advance();
        Ok(user_id)
    }

    /// Pass on the current candidate. Returns who was skipped.
    pub fn dislike(&mut self) -> Option<Uuid> {
        let skipped = self.current().map(|u| u.id);
        self.advance();
        skipped
    }

    /// Show the next image of `user_id`, wrapping. Returns the new index.
    /// Profiles without images stay at 0.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for an unknown ID.
    pub fn cycle_image(&mut self, user_id: Uuid) -> Result<usize, ChatError> {
        let count = self.user(user_id).ok_or(ChatError::UserNotFound(user_id))?.images.len();
        if count == 0 {
            return Ok(0);
        }
        let index = self.image_index.entry(user_id).or_insert(0);
        *index = (*index + 1) % count;
        Ok(*index)
    }

    /// Image currently shown for `user_id`, `None` if the profile has none.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for an unknown ID.
    pub fn current_image(&self, user_id: Uuid) -> Result<Option<&str>, ChatError> {
        let user = self.user(user_id).ok_or(ChatError::UserNotFound(user_id))?;
        let index = self.image_index.get(&user_id).copied().unwrap_or(0);
        Ok(user.images.get(index).map(String::as_str))
    }
}

#[cfg(test)]
#[path = "swipe_test.rs"]
mod tests;
