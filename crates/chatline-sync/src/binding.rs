//! What a synchronizer is bound to.

use chatline_core::{EventNames, Topic};

/// A topic together with where its history and live events come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicBinding {
    /// The message list.
    pub topic: Topic,
    /// History endpoint, absolute or relative to the fetcher's base URL.
    pub endpoint: String,
    /// Live event names for created and updated messages.
    pub events: EventNames,
}

impl TopicBinding {
    /// Bind with the conventional event names for `topic`.
    pub fn new(topic: Topic, endpoint: impl Into<String>) -> Self {
        let events = EventNames::for_topic(&topic);
        Self {
            topic,
            endpoint: endpoint.into(),
            events,
        }
    }

    /// Use explicit event names.
    pub fn with_events(mut self, events: EventNames) -> Self {
        self.events = events;
        self
    }
}
