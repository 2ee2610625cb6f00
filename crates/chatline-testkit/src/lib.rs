//! # Chatline Testkit
//!
//! Testing utilities for chatline.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: message and page builders, and a scripted topic backed by
//!   the in-memory transports
//! - **Generators**: Proptest strategies for interleavings of cache operations
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use chatline_core::PageCache;
//! use chatline_testkit::generators::{apply_all, cache_ops};
//!
//! proptest! {
//!     #[test]
//!     fn ids_stay_unique(ops in cache_ops(40)) {
//!         let mut cache = PageCache::new();
//!         apply_all(&mut cache, &ops);
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use chatline_core::Topic;
//! use chatline_testkit::fixtures::TopicFixture;
//!
//! let fixture = TopicFixture::new(Topic::channel("general"));
//! fixture.script_history(&[&["m4", "m3"], &["m2", "m1"]]);
//! assert_eq!(fixture.fetcher.request_count(), 0);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{message, message_with, page, TopicFixture};
