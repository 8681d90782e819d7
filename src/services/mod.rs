//! Session services: the chat and swipe core plus the actor that owns it.
//!
//! ARCHITECTURE
//! ============
//! `conversation`, `swipe` and `selection` are plain synchronous models.
//! `session` is the only place they are mutated, one command at a time.
//! `reply` and `upload` are pure helpers the session calls into.

pub mod conversation;
pub mod reply;
pub mod selection;
pub mod session;
pub mod swipe;
pub mod upload;
