//! # Chatline Core
//!
//! Pure data model for Chatline: topics, messages, pages and the page cache
//! that merges paginated history with live events.
//!
//! This crate contains no I/O. Fetching pages and receiving live events is
//! the job of `chatline-transport`; orchestrating both is `chatline-sync`.
//!
//! ## Key Types
//!
//! - [`Topic`] - Identity of one message list (a channel or a direct conversation)
//! - [`Message`] - Opaque record with a stable [`MessageId`]
//! - [`Page`] - One slice of history plus the [`Cursor`] to the next older slice
//! - [`PageCache`] - Ordered pages for one topic with global id uniqueness
//!
//! ## Merge Rules
//!
//! ```text
//! append_older_page  tail  existing id wins, new copy dropped
//! merge_created      head  existing id wins, event ignored
//! apply_updated      any   replaced in place, unknown id ignored
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use chatline_core::{Cursor, Message, Page, PageCache};
//!
//! let mut cache = PageCache::new();
//! cache.append_older_page(Page::new(
//!     vec![Message::new("a"), Message::new("b")],
//!     Some(Cursor::from("c1")),
//! ));
//! cache.merge_created(Message::new("z"));
//!
//! let ids: Vec<_> = cache.iter().map(|m| m.id.as_str()).collect();
//! assert_eq!(ids, ["z", "a", "b"]);
//! ```

pub mod cache;
pub mod message;
pub mod types;

pub use cache::{AppendOutcome, HeadMergeOutcome, MergeOutcome, PageCache, UpdateOutcome};
pub use message::{Message, Page};
pub use types::{Cursor, EventNames, MessageId, Topic, TopicKind};
