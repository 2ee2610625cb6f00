//! Identifier types for Chatline.
//!
//! All identifiers are newtypes so a cursor can never be passed where a
//! message id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable unique identifier of a message within a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Create a message id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque pagination token handed out by the history endpoint.
///
/// Passed back verbatim to fetch the next older page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Create a cursor from a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cursor {
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}

impl From<String> for Cursor {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Discriminator for the kind of message list a topic names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopicKind {
    /// A server channel.
    Channel,
    /// A one-to-one direct conversation.
    DirectConversation,
}

impl TopicKind {
    /// Name of the request parameter that carries the topic id.
    pub const fn param_key(self) -> &'static str {
        match self {
            TopicKind::Channel => "channelId",
            TopicKind::DirectConversation => "conversationId",
        }
    }
}

/// Identity of one logical message list.
///
/// Immutable for the lifetime of a binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    /// Channel or direct conversation.
    pub kind: TopicKind,
    /// Identifier of the channel or conversation.
    pub id: String,
}

impl Topic {
    /// Create a topic.
    pub fn new(kind: TopicKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Topic for a server channel.
    pub fn channel(id: impl Into<String>) -> Self {
        Self::new(TopicKind::Channel, id)
    }

    /// Topic for a direct conversation.
    pub fn conversation(id: impl Into<String>) -> Self {
        Self::new(TopicKind::DirectConversation, id)
    }

    /// Key identifying this topic's message list, `chat:<id>`.
    pub fn query_key(&self) -> String {
        format!("chat:{}", self.id)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind.param_key(), self.id)
    }
}

/// The two live event names a topic listens on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventNames {
    /// Event carrying a newly created message.
    pub created: String,
    /// Event carrying an edited (or soft-deleted) message.
    pub updated: String,
}

impl EventNames {
    /// Create from explicit names.
    pub fn new(created: impl Into<String>, updated: impl Into<String>) -> Self {
        Self {
            created: created.into(),
            updated: updated.into(),
        }
    }

    /// Conventional names: `chat:<id>:messages` and `chat:<id>:messages:update`.
    pub fn for_topic(topic: &Topic) -> Self {
        let key = topic.query_key();
        Self {
            created: format!("{key}:messages"),
            updated: format!("{key}:messages:update"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_keys() {
        assert_eq!(TopicKind::Channel.param_key(), "channelId");
        assert_eq!(TopicKind::DirectConversation.param_key(), "conversationId");
    }

    #[test]
    fn test_default_event_names() {
        let names = EventNames::for_topic(&Topic::channel("general"));
        assert_eq!(names.created, "chat:general:messages");
        assert_eq!(names.updated, "chat:general:messages:update");
    }

    #[test]
    fn test_topic_display() {
        let topic = Topic::conversation("c-42");
        assert_eq!(topic.to_string(), "conversationId=c-42");
        assert_eq!(topic.query_key(), "chat:c-42");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = MessageId::from("m1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"m1\"");

        let cursor: Cursor = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(cursor.as_str(), "abc");
    }
}
