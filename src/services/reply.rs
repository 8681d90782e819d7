//! Reply rules — the counterpart's canned responses.
//!
//! DESIGN
//! ======
//! An ordered table of (keywords, response) pairs evaluated top to bottom
//! against the lowercased message text. The first rule with any keyword
//! contained in the text wins; the fallback applies when nothing matches.
//! Matching is plain substring containment, so "hi" also matches "this".
//! Table order is part of the contract: "hello ... bye" is a greeting.

use crate::state::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Greeting,
    Status,
    Farewell,
    Identity,
    Gratitude,
    Fallback,
}

#[derive(Debug, Clone, Copy)]
pub struct ReplyRule {
    pub kind: ReplyKind,
    /// Lowercase substrings; any one of them triggers the rule.
    pub keywords: &'static [&'static str],
    pub response: &'static str,
}

impl ReplyRule {
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

pub const FALLBACK_REPLY: &str = "That's interesting! Tell me more or ask me something else.";
pub const IMAGE_REPLY: &str = "Thanks for sharing that image with me!";

pub const REPLY_RULES: &[ReplyRule] = &[
    ReplyRule {
        kind: ReplyKind::Greeting,
        keywords: &["hello", "hi"],
        response: "Hello there! How are you doing today?",
    },
    ReplyRule {
        kind: ReplyKind::Status,
        keywords: &["how are you"],
        response: "I'm doing great, thanks for asking! How can I help you?",
    },
    ReplyRule {
        kind: ReplyKind::Farewell,
        keywords: &["bye"],
        response: "Goodbye! Feel free to chat again anytime!",
    },
    ReplyRule {
        kind: ReplyKind::Identity,
        keywords: &["name"],
        response: "I'm Bumble Bot, your friendly assistant!",
    },
    ReplyRule {
        kind: ReplyKind::Gratitude,
        keywords: &["thank"],
        response: "You're welcome! I'm happy to help.",
    },
];

/// First rule whose keywords appear in `text`, if any.
#[must_use]
pub fn rule_for(text: &str) -> Option<&'static ReplyRule> {
    let lowered = text.to_lowercase();
    REPLY_RULES.iter().find(|rule| rule.matches(&lowered))
}

/// Classify `text` against the rule table.
#[must_use]
pub fn classify(text: &str) -> ReplyKind {
    rule_for(text).map_or(ReplyKind::Fallback, |rule| rule.kind)
}

/// Counterpart response to a text message.
#[must_use]
pub fn reply_to_text(text: &str) -> &'static str {
    rule_for(text).map_or(FALLBACK_REPLY, |rule| rule.response)
}

/// Counterpart response to any message. Images always get the fixed
/// acknowledgement regardless of accompanying text.
#[must_use]
pub fn reply_to(message: &Message) -> Option<&'static str> {
    if message.image.is_some() {
        return Some(IMAGE_REPLY);
    }
    message.text.as_deref().map(reply_to_text)
}

#[cfg(test)]
#[path = "reply_test.rs"]
mod tests;
