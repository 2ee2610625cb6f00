//! Messages and pages.
//!
//! The core only ever inspects a message's `id`. Every other field is kept
//! verbatim and handed back to consumers untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Cursor, MessageId};

/// An opaque chat message.
///
/// Serialized as a flat JSON object: `{"id": "...", ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stable unique identifier within the topic.
    pub id: MessageId,

    /// Everything else the server sent, untouched.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Message {
    /// Create a message with no payload fields.
    pub fn new(id: impl Into<MessageId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a payload field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// One slice of history as returned by the history endpoint.
///
/// Items are ordered newest first. `next_cursor` is `None` when there is no
/// older history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Messages in this page.
    pub items: Vec<Message>,

    /// Token for the next older page.
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<Cursor>,
}

impl Page {
    /// Create a page.
    pub fn new(items: Vec<Message>, next_cursor: Option<Cursor>) -> Self {
        Self { items, next_cursor }
    }

    /// Create the oldest page of a topic (no cursor).
    pub fn last(items: Vec<Message>) -> Self {
        Self::new(items, None)
    }

    /// Whether older history exists beyond this page.
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    /// Number of messages in the page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the page holds no messages.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
