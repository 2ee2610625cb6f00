//! Page cache: the merged, de-duplicated view of one topic's history.
//!
//! Page 0 is the head (most recent); higher indices are older history.
//! Pages are only ever appended at the tail, so a page's index never changes
//! once assigned. That lets the cache keep a `MessageId -> page index` map
//! up to date incrementally instead of scanning every page on each event.
//!
//! # Invariants
//!
//! - No two messages in the cache share an id, within a page or across pages.
//! - Existing pages are never reordered; live inserts only touch page 0.

use std::collections::HashMap;

use crate::message::{Message, Page};
use crate::types::{Cursor, MessageId};

/// Result of appending an older page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Messages that landed in the new page.
    pub appended: usize,
    /// Messages dropped because the id was already cached.
    pub dropped: usize,
}

/// Result of merging a "created" event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Message was prepended to the head page.
    Inserted,
    /// An entry with this id already exists (idempotent - not an error).
    AlreadyPresent,
}

/// Result of applying an "updated" event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The cached entry was replaced in place.
    Replaced,
    /// No cached entry with this id; the update was dropped.
    Unknown,
}

/// Result of merging a re-fetched head page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadMergeOutcome {
    /// Previously unseen messages inserted at the head.
    pub inserted: usize,
    /// Messages already cached; their cached copy is kept as is.
    pub already_present: usize,
}

impl HeadMergeOutcome {
    /// Whether the merge changed the view at all.
    pub fn changed(&self) -> bool {
        self.inserted > 0
    }
}

/// Ordered pages for a single topic.
#[derive(Debug, Clone, Default)]
pub struct PageCache {
    pages: Vec<Page>,
    /// Which page each cached id lives in.
    index: HashMap<MessageId, usize>,
}

impl PageCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page of older history at the tail.
    ///
    /// Messages whose id is already cached are dropped from the new page;
    /// the existing position wins. The page itself (and its cursor) is
    /// appended even if every message was dropped.
    pub fn append_older_page(&mut self, page: Page) -> AppendOutcome {
        let page_idx = self.pages.len();
        let mut items = Vec::with_capacity(page.items.len());
        let mut dropped = 0;

        for message in page.items {
            if self.index.contains_key(&message.id) {
                dropped += 1;
                continue;
            }
            self.index.insert(message.id.clone(), page_idx);
            items.push(message);
        }

        let appended = items.len();
        self.pages.push(Page::new(items, page.next_cursor));

        if dropped > 0 {
            tracing::debug!(page = page_idx, dropped, "dropped overlapping messages from older page");
        }

        AppendOutcome { appended, dropped }
    }

    /// Merge a newly created message at the head.
    ///
    /// A no-op if the id is already cached anywhere. With no pages yet, a
    /// head page without a cursor is created.
    pub fn merge_created(&mut self, message: Message) -> MergeOutcome {
        if self.index.contains_key(&message.id) {
            return MergeOutcome::AlreadyPresent;
        }

        self.index.insert(message.id.clone(), 0);
        match self.pages.first_mut() {
            Some(head) => head.items.insert(0, message),
            None => self.pages.push(Page::last(vec![message])),
        }

        MergeOutcome::Inserted
    }

    /// Replace a cached message in place.
    ///
    /// Updates for ids that are not cached are dropped, not inserted: an
    /// update payload is not a valid standalone history entry. This also
    /// means an edit to a message in a not-yet-loaded older page is lost.
    pub fn apply_updated(&mut self, message: Message) -> UpdateOutcome {
        let Some(&page_idx) = self.index.get(&message.id) else {
            tracing::debug!(id = %message.id, "update for unknown message dropped");
            return UpdateOutcome::Unknown;
        };

        let slot = self.pages[page_idx]
            .items
            .iter_mut()
            .find(|item| item.id == message.id);

        match slot {
            Some(slot) => {
                *slot = message;
                UpdateOutcome::Replaced
            }
            None => UpdateOutcome::Unknown,
        }
    }

    /// Merge a re-fetched head page (polling or refresh).
    ///
    /// Unseen ids go to the head via the [`merge_created`](Self::merge_created)
    /// rule, oldest first so the page's own order is kept. Cached ids are
    /// left untouched: a live update may have landed after this page was
    /// requested, and the page must not overwrite it. On an empty cache the
    /// page is appended as-is, keeping its cursor.
    pub fn merge_head_page(&mut self, page: Page) -> HeadMergeOutcome {
        if self.pages.is_empty() {
            let outcome = self.append_older_page(page);
            return HeadMergeOutcome {
                inserted: outcome.appended,
                already_present: outcome.dropped,
            };
        }

        let mut outcome = HeadMergeOutcome::default();
        for message in page.items.into_iter().rev() {
            match self.merge_created(message) {
                MergeOutcome::Inserted => outcome.inserted += 1,
                MergeOutcome::AlreadyPresent => outcome.already_present += 1,
            }
        }
        outcome
    }

    /// All pages concatenated head to tail.
    pub fn flatten_view(&self) -> Vec<Message> {
        self.iter().cloned().collect()
    }

    /// Iterate the flattened view without cloning.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }

    /// Cursor of the most recently fetched (tail) page.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.pages.last().and_then(|page| page.next_cursor.as_ref())
    }

    /// Whether older history can still be fetched.
    pub fn has_more(&self) -> bool {
        self.next_cursor().is_some()
    }

    /// Look up a cached message by id.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        let page_idx = *self.index.get(id)?;
        self.pages[page_idx].items.iter().find(|item| &item.id == id)
    }

    /// Whether a message with this id is cached.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.index.contains_key(id)
    }

    /// The pages, head first.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of cached messages.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no messages are cached.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Drop every page.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.index.clear();
    }
}
