//! Session actor — the single writer for all chat and swipe state.
//!
//! ARCHITECTURE
//! ============
//! One tokio task owns the conversation registry, the swipe queue and the
//! active selection. Callers hold a cloneable `SessionHandle` and talk to it
//! over a bounded command queue; each command runs to completion before the
//! next is read, so no two mutations ever interleave.
//!
//! Deferred work re-enters through the same queue:
//! - counterpart replies go through the `ReplyScheduler`, which holds them in
//!   FIFO order and posts `DeliverReply` once each is due;
//! - image decodes run on their own task and post `AppendImage` when done.
//!
//! Both hold only a weak sender. After teardown their posts fail and the
//! work is dropped without touching state.
//!
//! State changes are published as `SessionEvent`s on a broadcast channel so
//! views can redraw when a reply lands.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::ChatError;
use crate::seed::Seed;
use crate::services::conversation::{ConversationRegistry, ConversationSummary};
use crate::services::reply::{self, IMAGE_REPLY};
use crate::services::selection::{ActiveSelection, ActiveView};
use crate::services::swipe::SwipeQueue;
use crate::services::upload::{self, ImageUpload};
use crate::state::{Message, Sender, User};

// =============================================================================
// TYPES
// =============================================================================

/// Published after every state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Matched { conversation_id: Uuid, user_id: Uuid, created: bool },
    MessageAppended { conversation_id: Uuid, message: Message, len: usize },
    SelectionChanged { conversation_id: Option<Uuid> },
    CandidateChanged { cursor: usize, user_id: Option<Uuid> },
    ProfileImageChanged { user_id: Uuid, index: usize },
}

/// The profile card currently on top of the deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateView {
    pub user: User,
    pub image: Option<String>,
    pub cursor: usize,
    pub deck_len: usize,
}

type Reply<T> = oneshot::Sender<T>;

enum Command {
    SendMessage { conversation_id: Uuid, text: String, reply: Reply<Result<usize, ChatError>> },
    UploadImage { conversation_id: Uuid, upload: ImageUpload, reply: Reply<Result<(), ChatError>> },
    LikeUser { user_id: Uuid, reply: Reply<Result<Uuid, ChatError>> },
    DislikeUser { reply: Reply<Option<Uuid>> },
    SelectConversation { conversation_id: Uuid, reply: Reply<Result<(), ChatError>> },
    ClearSelection { reply: Reply<()> },
    CycleProfileImage { user_id: Uuid, reply: Reply<Result<usize, ChatError>> },
    CurrentCandidate { reply: Reply<Option<CandidateView>> },
    Conversation { conversation_id: Uuid, reply: Reply<Result<Vec<Message>, ChatError>> },
    Conversations { reply: Reply<Vec<ConversationSummary>> },
    ActiveConversation { reply: Reply<ActiveView> },
    // Internal: posted by deferred work.
    DeliverReply { conversation_id: Uuid, text: &'static str },
    AppendImage { conversation_id: Uuid, image: String },
    Shutdown,
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable entry point used by views.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, ChatError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ChatError::SessionClosed)?;
        rx.await.map_err(|_| ChatError::SessionClosed)
    }

    /// Send a text message as the local user. Schedules the counterpart reply.
    /// Returns the new thread length.
    ///
    /// # Errors
    ///
    /// `InvalidMessage` if `text` is blank, `ConversationNotFound` for an
    /// unknown conversation, `SessionClosed` after shutdown.
    pub async fn send_message(&self, conversation_id: Uuid, text: impl Into<String>) -> Result<usize, ChatError> {
        let text = text.into();
        self.request(|reply| Command::SendMessage { conversation_id, text, reply })
            .await?
    }

    /// Validate an upload and start decoding it. The image message is
    /// appended when decoding finishes.
    ///
    /// # Errors
    ///
    /// `UnsupportedFile` if the upload isn't an image, `ConversationNotFound`
    /// for an unknown conversation, `SessionClosed` after shutdown.
    pub async fn upload_image(&self, conversation_id: Uuid, upload: ImageUpload) -> Result<(), ChatError> {
        self.request(|reply| Command::UploadImage { conversation_id, upload, reply })
            .await?
    }

    /// Like the current candidate. Returns the (new or existing) conversation.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown user, `NotCurrentCandidate` if the user
    /// isn't on top of the deck, `SessionClosed` after shutdown.
    pub async fn like_user(&self, user_id: Uuid) -> Result<Uuid, ChatError> {
        self.request(|reply| Command::LikeUser { user_id, reply }).await?
    }

    /// Pass on the current candidate. Returns who was skipped.
    ///
    /// # Errors
    ///
    /// `SessionClosed` after shutdown.
    pub async fn dislike_user(&self) -> Result<Option<Uuid>, ChatError> {
        self.request(|reply| Command::DislikeUser { reply }).await
    }

    /// # Errors
    ///
    /// `ConversationNotFound` (selection unchanged), `SessionClosed` after shutdown.
    pub async fn select_conversation(&self, conversation_id: Uuid) -> Result<(), ChatError> {
        self.request(|reply| Command::SelectConversation { conversation_id, reply })
            .await?
    }

    /// # Errors
    ///
    /// `SessionClosed` after shutdown.
    pub async fn clear_selection(&self) -> Result<(), ChatError> {
        self.request(|reply| Command::ClearSelection { reply }).await
    }

    /// Show the next image of a profile. Returns the new image index.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown user, `SessionClosed` after shutdown.
    pub async fn cycle_profile_image(&self, user_id: Uuid) -> Result<usize, ChatError> {
        self.request(|reply| Command::CycleProfileImage { user_id, reply })
            .await?
    }

    /// # Errors
    ///
    /// `SessionClosed` after shutdown.
    pub async fn current_candidate(&self) -> Result<Option<CandidateView>, ChatError> {
        self.request(|reply| Command::CurrentCandidate { reply }).await
    }

    /// Messages of one conversation, in display order.
    ///
    /// # Errors
    ///
    /// `ConversationNotFound`, `SessionClosed` after shutdown.
    pub async fn conversation(&self, conversation_id: Uuid) -> Result<Vec<Message>, ChatError> {
        self.request(|reply| Command::Conversation { conversation_id, reply })
            .await?
    }

    /// Conversation list rows in creation order.
    ///
    /// # Errors
    ///
    /// `SessionClosed` after shutdown.
    pub async fn conversations(&self) -> Result<Vec<ConversationSummary>, ChatError> {
        self.request(|reply| Command::Conversations { reply }).await
    }

    /// # Errors
    ///
    /// `SessionClosed` after shutdown.
    pub async fn active_conversation(&self) -> Result<ActiveView, ChatError> {
        self.request(|reply| Command::ActiveConversation { reply }).await
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Stop the session. Pending replies and decodes are dropped.
    pub async fn shutdown(&self) {
        if self.tx.send(Command::Shutdown).await.is_err() {
            debug!("session already stopped");
        }
    }
}

// =============================================================================
// SPAWN
// =============================================================================

/// Spawn a session actor seeded with `seed`.
#[must_use]
pub fn spawn_session(seed: Seed, config: SessionConfig) -> (SessionHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(config.command_queue_capacity);
    let (events, _) = broadcast::channel(config.event_capacity);

    let (users, conversations) = seed.into_parts();
    let queue = SwipeQueue::new(users);
    let mut registry = ConversationRegistry::new();
    for conversation in conversations {
        if queue.user(conversation.user_id).is_none() {
            warn!(user_id = %conversation.user_id, "seeded conversation with unknown counterpart; skipping");
            continue;
        }
        if let Err(e) = registry.insert(conversation) {
            warn!(error = %e, "invalid seeded conversation; skipping");
        }
    }

    let session = Session {
        registry,
        queue,
        selection: ActiveSelection::new(),
        config,
        events: events.clone(),
        scheduler: spawn_reply_scheduler(tx.downgrade()),
        commands: tx.downgrade(),
    };

    info!(
        candidates = session.queue.len(),
        conversations = session.registry.len(),
        reply_delay_ms = u64::try_from(config.reply_delay.as_millis()).unwrap_or(u64::MAX),
        "session started"
    );

    let join = tokio::spawn(session.run(rx));
    (SessionHandle { tx, events }, join)
}

// =============================================================================
// REPLY SCHEDULER
// =============================================================================

struct ScheduledReply {
    due: Instant,
    conversation_id: Uuid,
    text: &'static str,
}

/// Replies arrive with non-decreasing due times (fixed delay), so handling
/// them strictly in arrival order also delivers them in due order.
fn spawn_reply_scheduler(commands: mpsc::WeakSender<Command>) -> mpsc::UnboundedSender<ScheduledReply> {
    let (tx, mut rx) = mpsc::unbounded_channel::<ScheduledReply>();
    tokio::spawn(async move {
        while let Some(scheduled) = rx.recv().await {
            tokio::time::sleep_until(scheduled.due).await;
            let delivered = match commands.upgrade() {
                Some(sender) => sender
                    .send(Command::DeliverReply { conversation_id: scheduled.conversation_id, text: scheduled.text })
                    .await
                    .is_ok(),
                None => false,
            };
            if !delivered {
                debug!(conversation_id = %scheduled.conversation_id, "session gone; dropping pending reply");
                break;
            }
        }
    });
    tx
}

// =============================================================================
// ACTOR
// =============================================================================

struct Session {
    registry: ConversationRegistry,
    queue: SwipeQueue,
    selection: ActiveSelection,
    config: SessionConfig,
    events: broadcast::Sender<SessionEvent>,
    scheduler: mpsc::UnboundedSender<ScheduledReply>,
    commands: mpsc::WeakSender<Command>,
}

impl Session {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            if matches!(command, Command::Shutdown) {
                break;
            }
            self.handle(command);
        }
        info!(conversations = self.registry.len(), "session stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::SendMessage { conversation_id, text, reply } => {
                let _ = reply.send(self.send_message(conversation_id, text));
            }
            Command::UploadImage { conversation_id, upload, reply } => {
                let _ = reply.send(self.upload_image(conversation_id, upload));
            }
            Command::LikeUser { user_id, reply } => {
                let _ = reply.send(self.like_user(user_id));
            }
            Command::DislikeUser { reply } => {
                let skipped = self.queue.dislike();
                debug!(user_id = ?skipped, "candidate passed");
                self.publish_candidate();
                let _ = reply.send(skipped);
            }
            Command::SelectConversation { conversation_id, reply } => {
                let result = self.selection.select(conversation_id, &self.registry);
                if result.is_ok() {
                    self.publish(SessionEvent::SelectionChanged { conversation_id: Some(conversation_id) });
                }
                let _ = reply.send(result);
            }
            Command::ClearSelection { reply } => {
                self.selection.clear();
                self.publish(SessionEvent::SelectionChanged { conversation_id: None });
                let _ = reply.send(());
            }
            Command::CycleProfileImage { user_id, reply } => {
                let result = self.queue.cycle_image(user_id);
                if let Ok(index) = result {
                    self.publish(SessionEvent::ProfileImageChanged { user_id, index });
                }
                let _ = reply.send(result);
            }
            Command::CurrentCandidate { reply } => {
                let _ = reply.send(self.current_candidate());
            }
            Command::Conversation { conversation_id, reply } => {
                let _ = reply.send(self.registry.get(conversation_id).map(<[Message]>::to_vec));
            }
            Command::Conversations { reply } => {
                let rows = self
                    .registry
                    .summaries(self.selection.get(), |id| self.queue.user(id));
                let _ = reply.send(rows);
            }
            Command::ActiveConversation { reply } => {
                let _ = reply.send(self.selection.view(&self.registry, |id| self.queue.user(id)));
            }
            Command::DeliverReply { conversation_id, text } => self.deliver_reply(conversation_id, text),
            Command::AppendImage { conversation_id, image } => self.append_image(conversation_id, image),
            Command::Shutdown => {}
        }
    }

    // -------------------------------------------------------------------------
    // Messages
    // -------------------------------------------------------------------------

    fn send_message(&mut self, conversation_id: Uuid, text: String) -> Result<usize, ChatError> {
        let message = Message::text(Sender::Me, text)?;
        let response = reply::reply_to(&message);
        let len = self.append(conversation_id, message)?;
        if let Some(text) = response {
            self.schedule_reply(conversation_id, text);
        }
        Ok(len)
    }

    fn upload_image(&mut self, conversation_id: Uuid, upload: ImageUpload) -> Result<(), ChatError> {
        if !self.registry.contains(conversation_id) {
            return Err(ChatError::ConversationNotFound(conversation_id));
        }
        let mime = upload.validate(self.config.max_upload_bytes)?;
        info!(%conversation_id, file = %upload.file_name, %mime, bytes = upload.bytes.len(), "decoding image upload");

        let commands = self.commands.clone();
        tokio::spawn(async move {
            let image = match upload::decode(mime, upload.bytes).await {
                Ok(image) => image,
                Err(e) => {
                    warn!(%conversation_id, error = %e, "image decode failed");
                    return;
                }
            };
            let Some(sender) = commands.upgrade() else {
                debug!(%conversation_id, "session gone; dropping decoded image");
                return;
            };
            if sender.send(Command::AppendImage { conversation_id, image }).await.is_err() {
                debug!(%conversation_id, "session gone; dropping decoded image");
            }
        });
        Ok(())
    }

    fn append_image(&mut self, conversation_id: Uuid, image: String) {
        let appended = Message::image(Sender::Me, image).and_then(|m| self.append(conversation_id, m));
        match appended {
            Ok(_) => self.schedule_reply(conversation_id, IMAGE_REPLY),
            Err(e) => warn!(%conversation_id, error = %e, "dropping decoded image"),
        }
    }

    fn deliver_reply(&mut self, conversation_id: Uuid, text: &'static str) {
        let appended = Message::text(Sender::Counterpart, text).and_then(|m| self.append(conversation_id, m));
        match appended {
            Ok(len) => info!(%conversation_id, len, "counterpart reply delivered"),
            Err(e) => warn!(%conversation_id, error = %e, "dropping counterpart reply"),
        }
    }

    fn append(&mut self, conversation_id: Uuid, message: Message) -> Result<usize, ChatError> {
        let len = self.registry.append(conversation_id, message.clone())?;
        debug!(%conversation_id, sender = ?message.sender, len, "message appended");
        self.publish(SessionEvent::MessageAppended { conversation_id, message, len });
        Ok(len)
    }

    fn schedule_reply(&self, conversation_id: Uuid, text: &'static str) {
        let scheduled = ScheduledReply { due: Instant::now() + self.config.reply_delay, conversation_id, text };
        if self.scheduler.send(scheduled).is_err() {
            warn!(%conversation_id, "reply scheduler stopped; reply dropped");
        }
    }

    // -------------------------------------------------------------------------
    // Swipe
    // -------------------------------------------------------------------------

    fn like_user(&mut self, user_id: Uuid) -> Result<Uuid, ChatError> {
        self.queue.like(user_id)?;
        let (conversation_id, created) = self.registry.open_for_user(user_id);
        info!(%user_id, %conversation_id, created, "matched");
        self.publish(SessionEvent::Matched { conversation_id, user_id, created });
        self.publish_candidate();
        Ok(conversation_id)
    }

    fn current_candidate(&self) -> Option<CandidateView> {
        let user = self.queue.current()?;
        let image = self
            .queue
            .current_image(user.id)
            .ok()
            .flatten()
            .map(str::to_owned);
        Some(CandidateView { user: user.clone(), image, cursor: self.queue.cursor(), deck_len: self.queue.len() })
    }

    fn publish_candidate(&self) {
        self.publish(SessionEvent::CandidateChanged {
            cursor: self.queue.cursor(),
            user_id: self.queue.current().map(|u| u.id),
        });
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
