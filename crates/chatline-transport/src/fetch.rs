//! Transport fetcher abstraction.
//!
//! A fetcher turns `(endpoint, topic, cursor)` into one page of history.
//! Implementations may use HTTP or anything else that can answer the same
//! question.

use async_trait::async_trait;

use chatline_core::{Cursor, Page, Topic};

use crate::error::Result;

/// Fetches cursor-paginated message history.
///
/// Implementations must be thread-safe (Send + Sync) and must not retry on
/// their own.
#[async_trait]
pub trait HistoryFetcher: Send + Sync {
    /// Fetch one page.
    ///
    /// `cursor` is `None` for the newest page.
    async fn fetch_page(&self, endpoint: &str, topic: &Topic, cursor: Option<&Cursor>)
        -> Result<Page>;
}

/// Query parameters for a history request.
///
/// The cursor pair is left out entirely when there is no cursor, rather
/// than being sent empty.
pub fn history_query(topic: &Topic, cursor: Option<&Cursor>) -> Vec<(&'static str, String)> {
    let mut query = Vec::with_capacity(2);
    if let Some(cursor) = cursor {
        query.push(("cursor", cursor.as_str().to_owned()));
    }
    query.push((topic.kind.param_key(), topic.id.clone()));
    query
}
