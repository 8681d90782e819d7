//! In-memory core of a swipe-and-chat app.
//!
//! DESIGN
//! ======
//! A cyclic deck of candidate profiles, matches that open conversations,
//! append-only message threads, an active-conversation selection and a
//! counterpart that answers every message after a short delay. There is no
//! backend: everything lives in one session actor and is gone when it stops.
//!
//! Views drive the session through [`SessionHandle`] and redraw on
//! [`SessionEvent`]s.

pub mod config;
pub mod error;
pub mod seed;
pub mod services;
pub mod state;

pub use config::SessionConfig;
pub use error::{ChatError, ErrorCode};
pub use seed::{Seed, SeedError};
pub use services::selection::ActiveView;
pub use services::session::{CandidateView, SessionEvent, SessionHandle, spawn_session};
pub use services::upload::ImageUpload;
pub use state::{Conversation, Message, Sender, User};
