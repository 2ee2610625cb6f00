//! Synchronizer state as seen by consumers.

use std::sync::Arc;

use chatline_core::{HeadMergeOutcome, Message, Topic};

/// Lifecycle state of a synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    /// No topic bound.
    Idle,
    /// Initial page in flight.
    Loading,
    /// Head page loaded; accepting live events and load-more requests.
    Ready,
    /// A load-more fetch is in flight; the ready view is still served.
    LoadingMore,
    /// The initial load failed; whatever view exists is still served.
    Error,
}

impl SyncStatus {
    /// Check if the head page has loaded.
    pub fn is_ready(self) -> bool {
        matches!(self, SyncStatus::Ready | SyncStatus::LoadingMore)
    }
}

/// Result of a load-more request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// An older page was appended.
    Loaded {
        /// Messages that were new to the cache.
        appended: usize,
    },
    /// There is no older history; nothing was fetched.
    Exhausted,
}

/// Result of a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// The head page is within the staleness window; nothing was fetched.
    Fresh,
    /// The head page was re-fetched and merged.
    Merged(HeadMergeOutcome),
    /// A failed initial load was retried successfully.
    Reloaded,
}

/// Everything a consumer needs to render one topic.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Bound topic, if any.
    pub topic: Option<Topic>,
    /// Lifecycle state.
    pub status: SyncStatus,
    /// Flattened view, newest first.
    pub messages: Arc<[Message]>,
    /// Whether older history can be requested.
    pub has_more: bool,
    /// Live channel connectivity.
    pub connected: bool,
    /// Description of the last failed initial load.
    pub last_error: Option<String>,
}

impl Snapshot {
    pub(crate) fn idle(connected: bool) -> Self {
        Self {
            topic: None,
            status: SyncStatus::Idle,
            messages: Arc::from(Vec::new()),
            has_more: false,
            connected,
            last_error: None,
        }
    }

    /// Message ids in view order.
    pub fn ids(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.id.as_str()).collect()
    }
}
