//! # Chatline Transport
//!
//! The two ways messages reach a client: paginated history requests and a
//! live event channel.
//!
//! ## Overview
//!
//! - [`HistoryFetcher`] performs exactly one request per call and never
//!   retries; retry policy belongs to the caller. [`HttpFetcher`] is the
//!   reqwest implementation.
//! - [`LiveChannel`] is a long-lived, multiplexed connection. Subscribers
//!   register per event name; connectivity transitions are published on a
//!   watch channel. [`WsLiveChannel`] is the WebSocket implementation and
//!   handles its own reconnects.
//! - [`memory`] holds scripted in-memory versions of both for tests.
//!
//! ## Live Frames
//!
//! ```text
//! {"event": "chat:general:messages", "payload": {"id": "m1", ...}}
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatline_core::Topic;
//! use chatline_transport::{HistoryFetcher, HttpFetcher};
//!
//! async fn example() {
//!     let fetcher = HttpFetcher::new();
//!     let topic = Topic::channel("general");
//!
//!     // First page: no cursor parameter is sent at all.
//!     let page = fetcher
//!         .fetch_page("https://chat.example.com/api/messages", &topic, None)
//!         .await
//!         .unwrap();
//!     println!("{} messages, more: {}", page.len(), page.has_more());
//! }
//! ```

pub mod error;
pub mod fetch;
pub mod http;
pub mod live;
pub mod memory;
pub mod ws;

pub use error::{ChannelError, Result, TransportError};
pub use fetch::{history_query, HistoryFetcher};
pub use http::HttpFetcher;
pub use live::{Connectivity, EventRouter, LiveChannel, Subscription, SubscriptionId};
pub use memory::{FetchRequest, MemoryFetcher, MemoryLiveChannel};
pub use ws::{LiveFrame, ReconnectPolicy, WsLiveChannel};
