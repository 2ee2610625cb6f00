//! Proptest generators for property-based testing.
//!
//! Ids are drawn from a small pool so that generated operation sequences
//! collide often: duplicate deliveries, overlapping pages and updates for
//! ids that are not cached yet all show up within a few dozen operations.

use proptest::prelude::*;

use chatline_core::{Cursor, Message, Page, PageCache};

/// Size of the id pool.
pub const ID_POOL: u8 = 24;

/// Generate a message id from the shared pool.
pub fn message_id() -> impl Strategy<Value = String> {
    (0..ID_POOL).prop_map(|n| format!("m{n}"))
}

/// Generate a message, sometimes carrying content.
pub fn message() -> impl Strategy<Value = Message> {
    (message_id(), proptest::option::of("[a-z ]{0,12}")).prop_map(|(id, content)| {
        let message = Message::new(id);
        match content {
            Some(content) => message.with_field("content", content),
            None => message,
        }
    })
}

/// Generate a page of up to `max_len` messages, with or without a cursor.
pub fn page(max_len: usize) -> impl Strategy<Value = Page> {
    (
        prop::collection::vec(message(), 0..=max_len),
        proptest::option::of("c[0-9]{1,3}"),
    )
        .prop_map(|(items, cursor)| Page::new(items, cursor.map(Cursor::from)))
}

/// One mutation of a page cache.
#[derive(Debug, Clone)]
pub enum CacheOp {
    AppendOlder(Page),
    Created(Message),
    Updated(Message),
    MergeHead(Page),
}

/// Generate a single cache operation.
pub fn cache_op() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        2 => page(6).prop_map(CacheOp::AppendOlder),
        3 => message().prop_map(CacheOp::Created),
        2 => message().prop_map(CacheOp::Updated),
        1 => page(6).prop_map(CacheOp::MergeHead),
    ]
}

/// Generate a sequence of up to `max_len` cache operations.
pub fn cache_ops(max_len: usize) -> impl Strategy<Value = Vec<CacheOp>> {
    prop::collection::vec(cache_op(), 0..=max_len)
}

/// Apply one operation.
pub fn apply(cache: &mut PageCache, op: &CacheOp) {
    match op {
        CacheOp::AppendOlder(page) => {
            cache.append_older_page(page.clone());
        }
        CacheOp::Created(message) => {
            cache.merge_created(message.clone());
        }
        CacheOp::Updated(message) => {
            cache.apply_updated(message.clone());
        }
        CacheOp::MergeHead(page) => {
            cache.merge_head_page(page.clone());
        }
    }
}

/// Apply every operation in order.
pub fn apply_all(cache: &mut PageCache, ops: &[CacheOp]) {
    for op in ops {
        apply(cache, op);
    }
}

/// Ids of the flattened view, in order.
pub fn view_ids(cache: &PageCache) -> Vec<String> {
    cache.iter().map(|m| m.id.to_string()).collect()
}
