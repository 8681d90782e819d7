use super::*;
use crate::state::test_helpers;

#[test]
fn default_is_empty() {
    let selection = ActiveSelection::new();
    assert!(selection.get().is_none());
    let registry = ConversationRegistry::new();
    assert_eq!(selection.view(&registry, |_| None), ActiveView::Empty);
}

#[test]
fn select_known_conversation() {
    let mut registry = ConversationRegistry::new();
    let (id, _) = registry.open_for_user(Uuid::new_v4());
    let mut selection = ActiveSelection::new();
    selection.select(id, &registry).unwrap();
    assert_eq!(selection.get(), Some(id));
}

#[test]
fn select_unknown_keeps_previous() {
    let mut registry = ConversationRegistry::new();
    let (id, _) = registry.open_for_user(Uuid::new_v4());
    let mut selection = ActiveSelection::new();
    selection.select(id, &registry).unwrap();

    let missing = Uuid::new_v4();
    let result = selection.select(missing, &registry);
    assert!(matches!(result, Err(ChatError::ConversationNotFound(got)) if got == missing));
    assert_eq!(selection.get(), Some(id));
}

#[test]
fn select_unknown_from_empty_stays_empty() {
    let registry = ConversationRegistry::new();
    let mut selection = ActiveSelection::new();
    assert!(selection.select(Uuid::new_v4(), &registry).is_err());
    assert!(selection.get().is_none());
}

#[test]
fn clear_resets_to_empty() {
    let mut registry = ConversationRegistry::new();
    let (id, _) = registry.open_for_user(Uuid::new_v4());
    let mut selection = ActiveSelection::new();
    selection.select(id, &registry).unwrap();
    selection.clear();
    assert!(selection.get().is_none());
}

// =============================================================
// ActiveView
// =============================================================

#[test]
fn empty_view_placeholder() {
    assert_eq!(ActiveView::Empty.placeholder().as_deref(), Some(NO_SELECTION_PLACEHOLDER));
}

#[test]
fn view_of_empty_thread_prompts_hello() {
    let mut registry = ConversationRegistry::new();
    let user = test_helpers::dummy_user("Rae", 1);
    let (id, _) = registry.open_for_user(user.id);
    let mut selection = ActiveSelection::new();
    selection.select(id, &registry).unwrap();

    let view = selection.view(&registry, |uid| (uid == user.id).then_some(&user));
    assert_eq!(view.placeholder().as_deref(), Some("Say hello to Rae!"));
}

#[test]
fn view_carries_messages_in_order() {
    let mut registry = ConversationRegistry::new();
    let user = test_helpers::dummy_user("Rae", 1);
    let (id, _) = registry.open_for_user(user.id);
    registry.append(id, test_helpers::my_text("a")).unwrap();
    registry.append(id, test_helpers::my_text("b")).unwrap();
    let mut selection = ActiveSelection::new();
    selection.select(id, &registry).unwrap();

    let view = selection.view(&registry, |uid| (uid == user.id).then_some(&user));
    let ActiveView::Conversation { conversation_id, user: shown, messages } = &view else {
        panic!("expected a conversation view");
    };
    assert_eq!(*conversation_id, id);
    assert_eq!(shown.as_ref().map(|u| u.name.as_str()), Some("Rae"));
    let texts: Vec<_> = messages.iter().filter_map(|m| m.text.as_deref()).collect();
    assert_eq!(texts, ["a", "b"]);
    assert!(view.placeholder().is_none());
}
