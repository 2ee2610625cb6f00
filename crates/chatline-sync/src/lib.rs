//! # Chatline Sync
//!
//! The synchronizer: one consistent, de-duplicated, ordered view of a
//! topic's messages, assembled from paginated history and live events.
//!
//! ## Overview
//!
//! A [`Synchronizer`] is a handle to a background task that exclusively
//! owns the [`PageCache`](chatline_core::PageCache) of the bound topic.
//! Consumer commands, fetch completions, live events, connectivity changes
//! and poll ticks are processed one at a time by that task, so cache
//! mutations never interleave.
//!
//! ## States
//!
//! ```text
//!            bind                ok
//!   Idle ----------> Loading ----------> Ready <------+
//!                      |  ^               |           | ok / failed
//!                 err  |  | refresh       | more      |
//!                      v  |               v           |
//!                     Error           LoadingMore ----+
//! ```
//!
//! ## Degraded Mode
//!
//! While the live channel is disconnected the head page is re-fetched every
//! [`SyncConfig::poll_interval`] and merged, so missed pushes still show up.
//! Polling stops as soon as the channel reconnects.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chatline_core::Topic;
//! use chatline_sync::{LoadMore, SyncConfig, Synchronizer, TopicBinding};
//! use chatline_transport::{HttpFetcher, ReconnectPolicy, WsLiveChannel};
//!
//! async fn example() {
//!     let live = Arc::new(
//!         WsLiveChannel::connect("wss://chat.example.com/live", ReconnectPolicy::default())
//!             .unwrap(),
//!     );
//!     let sync = Synchronizer::spawn(Arc::new(HttpFetcher::new()), live, SyncConfig::default());
//!
//!     let binding = TopicBinding::new(
//!         Topic::channel("general"),
//!         "https://chat.example.com/api/messages",
//!     );
//!     sync.bind_topic(binding).await.unwrap();
//!
//!     while let Ok(LoadMore::Loaded { .. }) = sync.request_more().await {}
//!     println!("{} messages", sync.current_view().len());
//!
//!     sync.shutdown().await;
//! }
//! ```

mod actor;
pub mod binding;
pub mod config;
pub mod error;
pub mod status;
pub mod synchronizer;

pub use binding::TopicBinding;
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use status::{LoadMore, Refresh, Snapshot, SyncStatus};
pub use synchronizer::Synchronizer;
