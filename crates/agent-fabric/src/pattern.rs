//! # Message Patterns
//!
//! A [`Pattern`] is a predicate over the envelope of a message (performative, conversation
//! tag, correlation id, payload kind). Each agent publishes the pattern of messages it is
//! willing to take in its current state; the runtime hands it the oldest queued message that
//! matches and leaves everything else in the mailbox.

use crate::acl::{Message, Payload, Performative};

/// Predicate over message envelopes, composed with [`Pattern::and`] / [`Pattern::or`].
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Any,
    Nothing,
    Performative(Performative),
    Conversation(String),
    Correlation(String),
    Kind(&'static str),
    And(Box<Pattern>, Box<Pattern>),
    Or(Box<Pattern>, Box<Pattern>),
}

impl Pattern {
    pub fn any() -> Self {
        Pattern::Any
    }

    pub fn nothing() -> Self {
        Pattern::Nothing
    }

    pub fn performative(performative: Performative) -> Self {
        Pattern::Performative(performative)
    }

    pub fn conversation(tag: impl Into<String>) -> Self {
        Pattern::Conversation(tag.into())
    }

    pub fn correlation(id: impl Into<String>) -> Self {
        Pattern::Correlation(id.into())
    }

    pub fn kind(kind: &'static str) -> Self {
        Pattern::Kind(kind)
    }

    pub fn and(self, other: Pattern) -> Self {
        match (self, other) {
            (Pattern::Any, p) | (p, Pattern::Any) => p,
            (Pattern::Nothing, _) | (_, Pattern::Nothing) => Pattern::Nothing,
            (a, b) => Pattern::And(Box::new(a), Box::new(b)),
        }
    }

    pub fn or(self, other: Pattern) -> Self {
        match (self, other) {
            (Pattern::Nothing, p) | (p, Pattern::Nothing) => p,
            (Pattern::Any, _) | (_, Pattern::Any) => Pattern::Any,
            (a, b) => Pattern::Or(Box::new(a), Box::new(b)),
        }
    }

    /// Folds a list of alternatives; an empty list matches nothing.
    pub fn any_of<I>(patterns: I) -> Self
    where
        I: IntoIterator<Item = Pattern>,
    {
        patterns.into_iter().fold(Pattern::Nothing, Pattern::or)
    }

    pub fn matches<P: Payload>(&self, message: &Message<P>) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Nothing => false,
            Pattern::Performative(p) => message.performative() == *p,
            Pattern::Conversation(tag) => message.conversation() == tag,
            Pattern::Correlation(id) => message.correlation_id() == Some(id.as_str()),
            Pattern::Kind(kind) => message.kind() == *kind,
            Pattern::And(a, b) => a.matches(message) && b.matches(message),
            Pattern::Or(a, b) => a.matches(message) || b.matches(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    enum Body {
        Quote,
        Grant,
    }

    impl Payload for Body {
        fn kind(&self) -> &'static str {
            match self {
                Body::Quote => "quote",
                Body::Grant => "grant",
            }
        }
    }

    fn quote() -> Message<Body> {
        Message::new(Performative::Inform, "cook-reserving", Body::Quote).with_correlation("op-1")
    }

    #[test]
    fn test_conjunction_requires_every_field() {
        let pattern = Pattern::conversation("cook-reserving")
            .and(Pattern::performative(Performative::Inform))
            .and(Pattern::correlation("op-1"));
        assert!(pattern.matches(&quote()));

        let other_correlation = Pattern::conversation("cook-reserving").and(Pattern::correlation("op-2"));
        assert!(!other_correlation.matches(&quote()));
    }

    #[test]
    fn test_disjunction_and_kind() {
        let pattern = Pattern::kind("grant").or(Pattern::conversation("cook-reserving"));
        assert!(pattern.matches(&quote()));

        let grant = Message::new(Performative::AcceptProposal, "elsewhere", Body::Grant);
        assert!(pattern.matches(&grant));
        assert!(!Pattern::kind("quote").matches(&grant));
    }

    #[test]
    fn test_empty_alternatives_match_nothing() {
        assert_eq!(Pattern::any_of(Vec::new()), Pattern::Nothing);
        assert!(!Pattern::any_of(Vec::new()).matches(&quote()));
        assert_eq!(Pattern::any().and(Pattern::kind("quote")), Pattern::Kind("quote"));
    }
}
