//! # Agent Communication Messages
//!
//! Agents talk to each other with speech-act messages: a [`Performative`] says what the
//! sender is doing (asking, informing, proposing, ...), the conversation tag and the
//! optional correlation id say which exchange the message belongs to, and the payload
//! carries the domain data.
//!
//! The payload type is chosen by the application. It only has to name its own variant via
//! [`Payload::kind`] so that mailboxes can select on it without looking inside.
//!
//! ```rust
//! use agent_fabric::{Message, Payload, Performative};
//!
//! #[derive(Debug, Clone)]
//! enum Kitchen { Ping, Pong(u32) }
//!
//! impl Payload for Kitchen {
//!     fn kind(&self) -> &'static str {
//!         match self { Kitchen::Ping => "ping", Kitchen::Pong(_) => "pong" }
//!     }
//! }
//!
//! let msg = Message::new(Performative::Request, "table-talk", Kitchen::Ping)
//!     .with_correlation("c-1");
//! assert_eq!(msg.kind(), "ping");
//! assert_eq!(msg.correlation_id(), Some("c-1"));
//! ```

use crate::address::ActorAddress;
use std::fmt::{Debug, Display};

/// The speech-act tag of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Performative {
    Request,
    Inform,
    Propose,
    AcceptProposal,
    RejectProposal,
    Cancel,
    Confirm,
    Disconfirm,
}

impl Display for Performative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Performative::Request => "REQUEST",
            Performative::Inform => "INFORM",
            Performative::Propose => "PROPOSE",
            Performative::AcceptProposal => "ACCEPT",
            Performative::RejectProposal => "REJECT",
            Performative::Cancel => "CANCEL",
            Performative::Confirm => "CONFIRM",
            Performative::Disconfirm => "DISCONFIRM",
        };
        f.write_str(name)
    }
}

/// Application payload carried by a [`Message`].
pub trait Payload: Debug + Clone + Send + Sync + 'static {
    /// Stable name of the payload variant, used by [`Pattern::kind`](crate::Pattern::kind).
    fn kind(&self) -> &'static str;
}

/// A message travelling between agents.
///
/// Messages are immutable once sent: the fabric wraps them in an `Arc` and every receiver
/// sees the same instance.
#[derive(Debug, Clone)]
pub struct Message<P> {
    performative: Performative,
    conversation: String,
    correlation_id: Option<String>,
    payload: P,
    sender: Option<ActorAddress>,
    receivers: Vec<ActorAddress>,
}

impl<P: Payload> Message<P> {
    pub fn new(performative: Performative, conversation: impl Into<String>, payload: P) -> Self {
        Self {
            performative,
            conversation: conversation.into(),
            correlation_id: None,
            payload,
            sender: None,
            receivers: Vec::new(),
        }
    }

    /// Adds one receiver.
    pub fn to(mut self, receiver: ActorAddress) -> Self {
        self.receivers.push(receiver);
        self
    }

    /// Adds every receiver in `receivers`.
    pub fn to_all<I>(mut self, receivers: I) -> Self
    where
        I: IntoIterator<Item = ActorAddress>,
    {
        self.receivers.extend(receivers);
        self
    }

    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Builds the answer to this message: same conversation and correlation id, addressed
    /// back to the sender.
    pub fn reply(&self, performative: Performative, payload: P) -> Message<P> {
        Message {
            performative,
            conversation: self.conversation.clone(),
            correlation_id: self.correlation_id.clone(),
            payload,
            sender: None,
            receivers: self.sender.iter().cloned().collect(),
        }
    }

    pub fn performative(&self) -> Performative {
        self.performative
    }

    pub fn conversation(&self) -> &str {
        &self.conversation
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// The sending agent. Always set on messages taken out of a mailbox.
    pub fn sender(&self) -> Option<&ActorAddress> {
        self.sender.as_ref()
    }

    pub fn receivers(&self) -> &[ActorAddress] {
        &self.receivers
    }

    pub(crate) fn stamp(mut self, sender: ActorAddress) -> Self {
        self.sender = Some(sender);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Note(&'static str);

    impl Payload for Note {
        fn kind(&self) -> &'static str {
            "note"
        }
    }

    #[test]
    fn test_reply_keeps_conversation_and_targets_sender() {
        let asker = ActorAddress::new(1, "asker");
        let request = Message::new(Performative::Request, "menu", Note("how long?"))
            .with_correlation("abc")
            .stamp(asker.clone());

        let answer = request.reply(Performative::Inform, Note("five"));

        assert_eq!(answer.performative(), Performative::Inform);
        assert_eq!(answer.conversation(), "menu");
        assert_eq!(answer.correlation_id(), Some("abc"));
        assert_eq!(answer.receivers(), &[asker]);
        assert!(answer.sender().is_none(), "sender is stamped on send");
    }
}
