//! Test fixtures and helpers.
//!
//! Common setup code for synchronizer and integration tests.

use std::sync::Arc;

use chatline_core::{Cursor, Message, Page, Topic};
use chatline_sync::{SyncConfig, Synchronizer, TopicBinding};
use chatline_transport::{MemoryFetcher, MemoryLiveChannel};

/// History endpoint used by fixtures.
pub const ENDPOINT: &str = "/api/messages";

/// A message with no fields besides its id.
pub fn message(id: &str) -> Message {
    Message::new(id)
}

/// A message with a `content` field.
pub fn message_with(id: &str, content: &str) -> Message {
    Message::new(id).with_field("content", content)
}

/// A page of bare messages, newest first.
pub fn page(ids: &[&str], cursor: Option<&str>) -> Page {
    Page::new(ids.iter().map(|id| message(id)).collect(), cursor.map(Cursor::from))
}

/// Cursor naming the page at `index` in a scripted chain.
pub fn chain_cursor(index: usize) -> String {
    format!("c{index}")
}

/// One topic wired to in-memory transports.
pub struct TopicFixture {
    pub topic: Topic,
    pub binding: TopicBinding,
    pub fetcher: Arc<MemoryFetcher>,
    pub live: Arc<MemoryLiveChannel>,
}

impl TopicFixture {
    /// Fixture with a connected live channel.
    pub fn new(topic: Topic) -> Self {
        Self::with_transports(topic, MemoryFetcher::new(), MemoryLiveChannel::new())
    }

    /// Fixture with a live channel that starts disconnected.
    pub fn disconnected(topic: Topic) -> Self {
        Self::with_transports(topic, MemoryFetcher::new(), MemoryLiveChannel::disconnected())
    }

    /// Fixture sharing existing transports (several topics, one connection).
    pub fn with_transports(
        topic: Topic,
        fetcher: Arc<MemoryFetcher>,
        live: Arc<MemoryLiveChannel>,
    ) -> Self {
        Self {
            binding: TopicBinding::new(topic.clone(), ENDPOINT),
            topic,
            fetcher,
            live,
        }
    }

    /// Script a chain of pages, newest first. Page `i` carries cursor
    /// `c{i+1}` pointing to page `i + 1`; the last page has none.
    pub fn script_history(&self, pages: &[&[&str]]) {
        for (index, ids) in pages.iter().enumerate() {
            let request_cursor = (index > 0).then(|| chain_cursor(index));
            let next = (index + 1 < pages.len()).then(|| chain_cursor(index + 1));
            self.fetcher.set_page(
                &self.topic,
                request_cursor.as_deref(),
                page(ids, next.as_deref()),
            );
        }
    }

    /// Replace the head page returned by cursorless requests.
    pub fn script_head(&self, ids: &[&str], cursor: Option<&str>) {
        self.fetcher.set_page(&self.topic, None, page(ids, cursor));
    }

    /// Push a "created" event. Returns the subscribers reached.
    pub fn emit_created(&self, message: Message) -> usize {
        self.live.emit(&self.binding.events.created, message)
    }

    /// Push an "updated" event. Returns the subscribers reached.
    pub fn emit_updated(&self, message: Message) -> usize {
        self.live.emit(&self.binding.events.updated, message)
    }

    /// Spawn an unbound synchronizer over the fixture's transports.
    pub fn synchronizer(&self, config: SyncConfig) -> Synchronizer {
        Synchronizer::spawn(self.fetcher.clone(), self.live.clone(), config)
    }
}
