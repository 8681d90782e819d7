use std::time::Duration;

use super::*;
use crate::seed::UserRef;
use crate::services::reply::FALLBACK_REPLY;
use crate::state::test_helpers::{conversation_unchecked, dummy_user, my_text};

const GREETING: &str = "Hello there! How are you doing today?";
const FAREWELL: &str = "Goodbye! Feel free to chat again anytime!";
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn two_user_session() -> (SessionHandle, User, User) {
    let a = dummy_user("alice", 2);
    let b = dummy_user("bea", 1);
    let (handle, _join) = spawn_session(Seed::new(vec![a.clone(), b.clone()]), SessionConfig::default());
    (handle, a, b)
}

fn texts(messages: &[Message]) -> Vec<&str> {
    messages.iter().filter_map(|m| m.text.as_deref()).collect()
}

async fn wait_for_counterpart(events: &mut broadcast::Receiver<SessionEvent>) -> Message {
    loop {
        match events.recv().await.unwrap() {
            SessionEvent::MessageAppended { message, .. } if message.sender == Sender::Counterpart => {
                return message;
            }
            _ => {}
        }
    }
}

// =============================================================================
// Scenario: like -> send -> delayed reply
// =============================================================================

#[tokio::test(start_paused = true)]
async fn like_send_and_receive_reply() {
    let (handle, a, b) = two_user_session();

    let convo = handle.like_user(a.id).await.unwrap();
    assert!(handle.conversation(convo).await.unwrap().is_empty());

    assert_eq!(handle.send_message(convo, "hello").await.unwrap(), 1);
    let messages = handle.conversation(convo).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, Sender::Me);
    assert_eq!(messages[0].text.as_deref(), Some("hello"));

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let messages = handle.conversation(convo).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].sender, Sender::Counterpart);
    assert_eq!(messages[1].text.as_deref(), Some(GREETING));

    let candidate = handle.current_candidate().await.unwrap().unwrap();
    assert_eq!(candidate.user.id, b.id);
    assert_eq!(candidate.cursor, 1);
}

#[tokio::test(start_paused = true)]
async fn reply_not_delivered_before_delay() {
    let (handle, a, _) = two_user_session();
    let convo = handle.like_user(a.id).await.unwrap();
    handle.send_message(convo, "what's new").await.unwrap();

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(handle.conversation(convo).await.unwrap().len(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let messages = handle.conversation(convo).await.unwrap();
    assert_eq!(texts(&messages), ["what's new", FALLBACK_REPLY]);
}

#[tokio::test(start_paused = true)]
async fn replies_follow_trigger_order() {
    let (handle, a, _) = two_user_session();
    let convo = handle.like_user(a.id).await.unwrap();

    handle.send_message(convo, "hello").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.send_message(convo, "bye").await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let messages = handle.conversation(convo).await.unwrap();
    assert_eq!(texts(&messages), ["hello", "bye", GREETING, FAREWELL]);
}

#[tokio::test(start_paused = true)]
async fn replies_land_in_their_own_conversation() {
    let (handle, a, b) = two_user_session();
    let convo_a = handle.like_user(a.id).await.unwrap();
    let convo_b = handle.like_user(b.id).await.unwrap();

    handle.send_message(convo_a, "hi").await.unwrap();
    handle.send_message(convo_b, "bye").await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(texts(&handle.conversation(convo_a).await.unwrap()), ["hi", GREETING]);
    assert_eq!(texts(&handle.conversation(convo_b).await.unwrap()), ["bye", FAREWELL]);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_reply_event() {
    let (handle, a, _) = two_user_session();
    let mut events = handle.subscribe();
    let convo = handle.like_user(a.id).await.unwrap();
    handle.send_message(convo, "thank you!").await.unwrap();

    let reply = wait_for_counterpart(&mut events).await;
    assert_eq!(reply.text.as_deref(), Some("You're welcome! I'm happy to help."));
}

// =============================================================================
// send_message errors
// =============================================================================

#[tokio::test]
async fn send_blank_message_rejected() {
    let (handle, a, _) = two_user_session();
    let convo = handle.like_user(a.id).await.unwrap();

    assert!(matches!(handle.send_message(convo, "").await, Err(ChatError::InvalidMessage(_))));
    assert!(matches!(handle.send_message(convo, "   ").await, Err(ChatError::InvalidMessage(_))));
    assert!(handle.conversation(convo).await.unwrap().is_empty());
}

#[tokio::test]
async fn send_to_unknown_conversation() {
    let (handle, _, _) = two_user_session();
    let result = handle.send_message(Uuid::new_v4(), "hello").await;
    assert!(matches!(result, Err(ChatError::ConversationNotFound(_))));
}

// =============================================================================
// Swipe
// =============================================================================

#[tokio::test]
async fn like_then_dislike_advances_two_and_creates_one_conversation() {
    let users: Vec<User> = (0..3).map(|i| dummy_user(&format!("u{i}"), 1)).collect();
    let (handle, _join) = spawn_session(Seed::new(users.clone()), SessionConfig::default());

    let first = handle.current_candidate().await.unwrap().unwrap();
    let convo = handle.like_user(first.user.id).await.unwrap();
    assert_eq!(handle.dislike_user().await.unwrap(), Some(users[1].id));

    let now = handle.current_candidate().await.unwrap().unwrap();
    assert_eq!(now.cursor, 2);
    let rows = handle.conversations().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].conversation_id, convo);
    assert_eq!(rows[0].user_id, users[0].id);
}

#[tokio::test]
async fn liking_again_after_wrap_reuses_conversation() {
    let (handle, a, _) = two_user_session();
    let first = handle.like_user(a.id).await.unwrap();
    handle.dislike_user().await.unwrap();
    let second = handle.like_user(a.id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(handle.conversations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn like_wrong_candidate_rejected() {
    let (handle, _, b) = two_user_session();
    let result = handle.like_user(b.id).await;
    assert!(matches!(result, Err(ChatError::NotCurrentCandidate { .. })));
    assert!(handle.conversations().await.unwrap().is_empty());
    assert_eq!(handle.current_candidate().await.unwrap().unwrap().cursor, 0);
}

#[tokio::test]
async fn like_unknown_user_rejected() {
    let (handle, _, _) = two_user_session();
    assert!(matches!(handle.like_user(Uuid::new_v4()).await, Err(ChatError::UserNotFound(_))));
}

#[tokio::test]
async fn empty_deck_has_no_candidate() {
    let (handle, _join) = spawn_session(Seed::default(), SessionConfig::default());
    assert!(handle.current_candidate().await.unwrap().is_none());
    assert!(handle.dislike_user().await.unwrap().is_none());
}

#[tokio::test]
async fn cycle_profile_image_updates_candidate_card() {
    let (handle, a, _) = two_user_session();
    assert_eq!(handle.cycle_profile_image(a.id).await.unwrap(), 1);
    let card = handle.current_candidate().await.unwrap().unwrap();
    assert_eq!(card.image.as_deref(), Some(a.images[1].as_str()));
    assert!(matches!(
        handle.cycle_profile_image(Uuid::new_v4()).await,
        Err(ChatError::UserNotFound(_))
    ));
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn select_and_view_active_conversation() {
    let (handle, a, _) = two_user_session();
    assert_eq!(handle.active_conversation().await.unwrap(), ActiveView::Empty);

    let convo = handle.like_user(a.id).await.unwrap();
    handle.select_conversation(convo).await.unwrap();
    let view = handle.active_conversation().await.unwrap();
    assert_eq!(view.placeholder().as_deref(), Some("Say hello to alice!"));

    let rows = handle.conversations().await.unwrap();
    assert!(rows[0].active);

    handle.clear_selection().await.unwrap();
    assert_eq!(handle.active_conversation().await.unwrap(), ActiveView::Empty);
}

#[tokio::test]
async fn select_unknown_keeps_selection() {
    let (handle, a, _) = two_user_session();
    let convo = handle.like_user(a.id).await.unwrap();
    handle.select_conversation(convo).await.unwrap();

    let result = handle.select_conversation(Uuid::new_v4()).await;
    assert!(matches!(result, Err(ChatError::ConversationNotFound(_))));
    let ActiveView::Conversation { conversation_id, .. } = handle.active_conversation().await.unwrap() else {
        panic!("selection should be kept");
    };
    assert_eq!(conversation_id, convo);
}

#[tokio::test]
async fn like_does_not_change_selection() {
    let (handle, a, _) = two_user_session();
    handle.like_user(a.id).await.unwrap();
    assert_eq!(handle.active_conversation().await.unwrap(), ActiveView::Empty);
}

// =============================================================================
// Seeded conversations
// =============================================================================

#[tokio::test]
async fn seeded_conversation_is_listed_and_reused_on_like() {
    let a = dummy_user("alice", 1);
    let seed = Seed::new(vec![a.clone()])
        .with_conversation(UserRef::Index(0), vec![my_text("seeded")])
        .unwrap();
    let (handle, _join) = spawn_session(seed, SessionConfig::default());

    let rows = handle.conversations().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].preview, "You: seeded");
    let convo = handle.like_user(a.id).await.unwrap();
    assert_eq!(convo, rows[0].conversation_id);
}

#[tokio::test]
async fn bad_seeded_conversations_are_skipped() {
    let a = dummy_user("alice", 1);
    let blank = Message { text: None, ..my_text("placeholder") };
    let invalid = conversation_unchecked(a.id, vec![blank]);
    let stranger = conversation_unchecked(Uuid::new_v4(), vec![my_text("who?")]);
    let seed = Seed::unchecked(vec![a.clone()], vec![invalid, stranger]);
    let (handle, _join) = spawn_session(seed, SessionConfig::default());

    assert!(handle.conversations().await.unwrap().is_empty());
    // The counterpart still matches into a fresh, empty thread.
    let convo = handle.like_user(a.id).await.unwrap();
    assert!(handle.conversation(convo).await.unwrap().is_empty());
}

// =============================================================================
// Image upload
// =============================================================================

#[tokio::test]
async fn upload_appends_image_then_acknowledgement() {
    let a = dummy_user("alice", 1);
    let config = SessionConfig::default().with_reply_delay(Duration::from_millis(10));
    let (handle, _join) = spawn_session(Seed::new(vec![a.clone()]), config);
    let convo = handle.like_user(a.id).await.unwrap();
    let mut events = handle.subscribe();

    let upload = ImageUpload::new("me.png", None, PNG_BYTES.to_vec());
    handle.upload_image(convo, upload).await.unwrap();

    let ack = tokio::time::timeout(Duration::from_secs(5), wait_for_counterpart(&mut events))
        .await
        .unwrap();
    assert_eq!(ack.text.as_deref(), Some(IMAGE_REPLY));

    let messages = handle.conversation(convo).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::Me);
    assert!(messages[0].image.as_deref().unwrap().starts_with("data:image/png;base64,"));
    assert!(messages[0].text.is_none());
}

#[tokio::test]
async fn upload_non_image_rejected() {
    let (handle, a, _) = two_user_session();
    let convo = handle.like_user(a.id).await.unwrap();
    let upload = ImageUpload::new("notes.txt", Some("text/plain".into()), b"hello".to_vec());
    assert!(matches!(handle.upload_image(convo, upload).await, Err(ChatError::UnsupportedFile(_))));
    assert!(handle.conversation(convo).await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_to_unknown_conversation() {
    let (handle, _, _) = two_user_session();
    let upload = ImageUpload::new("me.png", None, PNG_BYTES.to_vec());
    let result = handle.upload_image(Uuid::new_v4(), upload).await;
    assert!(matches!(result, Err(ChatError::ConversationNotFound(_))));
}

// =============================================================================
// Teardown
// =============================================================================

#[tokio::test(start_paused = true)]
async fn shutdown_drops_pending_reply() {
    let a = dummy_user("alice", 1);
    let (handle, join) = spawn_session(Seed::new(vec![a.clone()]), SessionConfig::default());
    let convo = handle.like_user(a.id).await.unwrap();
    handle.send_message(convo, "hello").await.unwrap();

    handle.shutdown().await;
    join.await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(matches!(handle.conversation(convo).await, Err(ChatError::SessionClosed)));
    assert!(matches!(handle.send_message(convo, "hi").await, Err(ChatError::SessionClosed)));
}

#[tokio::test]
async fn shutdown_twice_is_harmless() {
    let (handle, _, _) = two_user_session();
    handle.shutdown().await;
    handle.shutdown().await;
}
