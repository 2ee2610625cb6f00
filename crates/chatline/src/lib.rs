//! # Chatline
//!
//! Real-time chat sync: one consistent, ordered, de-duplicated view of a
//! channel or direct conversation, assembled from paginated history and a
//! live event stream.
//!
//! ## Overview
//!
//! - **History**: pages fetched newest-first over HTTP, walked back with an
//!   opaque cursor
//! - **Live events**: one multiplexed WebSocket connection carrying
//!   "created" and "updated" events for every topic
//! - **Degraded mode**: while the live connection is down the head page is
//!   polled and merged, so missed pushes still show up
//!
//! ## Key Concepts
//!
//! - **Topic**: a channel or a direct conversation.
//! - **Page**: a batch of messages plus the cursor to the next older batch.
//! - **Head page**: page 0, the newest messages. Live inserts land here.
//! - **Synchronizer**: the task that owns one topic's cache and merges every
//!   source into it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatline::{ChatClient, ClientConfig, Topic, TopicBinding};
//!
//! async fn example() -> chatline::Result<()> {
//!     let client = ChatClient::connect(ClientConfig {
//!         api_base: Some("https://chat.example.com".into()),
//!         ..ClientConfig::new("wss://chat.example.com/live")
//!     })?;
//!
//!     let general = client
//!         .open(TopicBinding::new(Topic::channel("general"), "/api/messages"))
//!         .await?;
//!
//!     for message in general.current_view().iter() {
//!         println!("{}", message.id);
//!     }
//!
//!     general.request_more().await?;
//!     general.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `chatline::core` - Messages, pages, topics and the page cache
//! - `chatline::transport` - History fetchers and live channels
//! - `chatline::sync` - The synchronizer

pub mod client;
pub mod error;

// Re-export component crates
pub use chatline_core as core;
pub use chatline_sync as sync;
pub use chatline_transport as transport;

// Re-export main types for convenience
pub use client::{ChatClient, ClientConfig};
pub use error::{ClientError, Result};

// Re-export commonly used types
pub use chatline_core::{Cursor, EventNames, Message, MessageId, Page, Topic, TopicKind};
pub use chatline_sync::{
    LoadMore, Refresh, Snapshot, SyncConfig, SyncError, SyncStatus, Synchronizer, TopicBinding,
};
pub use chatline_transport::{Connectivity, ReconnectPolicy};
