//! In-memory transports for testing.
//!
//! [`MemoryFetcher`] answers from a script keyed by `(topic, cursor)` and
//! records every request. [`MemoryLiveChannel`] lets a test flip
//! connectivity and emit events by hand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{watch, Semaphore};

use chatline_core::{Cursor, Message, Page, Topic};

use crate::error::{Result, TransportError};
use crate::fetch::HistoryFetcher;
use crate::live::{Connectivity, EventRouter, LiveChannel, Subscription};

/// A request seen by [`MemoryFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub endpoint: String,
    pub topic: Topic,
    pub cursor: Option<Cursor>,
}

type ScriptKey = (Topic, Option<Cursor>);

#[derive(Default)]
struct FetcherInner {
    responses: HashMap<ScriptKey, Result<Page>>,
    requests: Vec<FetchRequest>,
}

/// Scripted history fetcher.
///
/// Unscripted requests fail with status 404. While held, fetches are
/// recorded immediately but do not complete until released, which lets a
/// test observe a request "in flight".
pub struct MemoryFetcher {
    inner: Mutex<FetcherInner>,
    held: AtomicBool,
    waiting: AtomicUsize,
    gate: Semaphore,
}

impl MemoryFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(FetcherInner::default()),
            held: AtomicBool::new(false),
            waiting: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        })
    }

    fn inner(&self) -> MutexGuard<'_, FetcherInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer `(topic, cursor)` with `page` from now on.
    pub fn set_page(&self, topic: &Topic, cursor: Option<&str>, page: Page) {
        self.inner()
            .responses
            .insert((topic.clone(), cursor.map(Cursor::from)), Ok(page));
    }

    /// Answer `(topic, cursor)` with `error` from now on.
    pub fn set_failure(&self, topic: &Topic, cursor: Option<&str>, error: TransportError) {
        self.inner()
            .responses
            .insert((topic.clone(), cursor.map(Cursor::from)), Err(error));
    }

    /// Every request so far, in issue order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.inner().requests.clone()
    }

    /// Number of requests so far.
    pub fn request_count(&self) -> usize {
        self.inner().requests.len()
    }

    /// Hold subsequent fetches until released.
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Let `n` held fetches complete.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Stop holding and release every waiting fetch.
    pub fn open(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.gate.add_permits(self.waiting.load(Ordering::SeqCst));
    }

    /// Number of fetches currently held.
    pub fn held_count(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

/// Counts a held fetch for as long as it waits, including when the waiting
/// future is dropped.
struct Waiting<'a>(&'a AtomicUsize);

impl<'a> Waiting<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HistoryFetcher for MemoryFetcher {
    async fn fetch_page(
        &self,
        endpoint: &str,
        topic: &Topic,
        cursor: Option<&Cursor>,
    ) -> Result<Page> {
        self.inner().requests.push(FetchRequest {
            endpoint: endpoint.to_owned(),
            topic: topic.clone(),
            cursor: cursor.cloned(),
        });

        if self.held.load(Ordering::SeqCst) {
            let _waiting = Waiting::enter(&self.waiting);
            match self.gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(TransportError::Network("fetch gate closed".into())),
            }
        }

        self.inner()
            .responses
            .get(&(topic.clone(), cursor.cloned()))
            .cloned()
            .unwrap_or(Err(TransportError::Status { status: 404 }))
    }
}

/// Live channel driven by hand.
pub struct MemoryLiveChannel {
    router: EventRouter,
}

impl MemoryLiveChannel {
    /// Create a connected channel.
    pub fn new() -> Arc<Self> {
        Self::with_connectivity(Connectivity::Connected)
    }

    /// Create a channel that starts disconnected.
    pub fn disconnected() -> Arc<Self> {
        Self::with_connectivity(Connectivity::Disconnected)
    }

    fn with_connectivity(initial: Connectivity) -> Arc<Self> {
        Arc::new(Self {
            router: EventRouter::new(initial),
        })
    }

    /// Publish `message` under `event`. Returns the subscribers reached.
    pub fn emit(&self, event: &str, message: Message) -> usize {
        self.router.dispatch(event, message)
    }

    /// Flip connectivity.
    pub fn set_connected(&self, connected: bool) {
        let state = if connected {
            Connectivity::Connected
        } else {
            Connectivity::Disconnected
        };
        self.router.set_connectivity(state);
    }

    /// Live registrations for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.router.subscriber_count(event)
    }
}

impl LiveChannel for MemoryLiveChannel {
    fn connectivity(&self) -> watch::Receiver<Connectivity> {
        self.router.connectivity()
    }

    fn subscribe(&self, event: &str) -> Subscription {
        self.router.subscribe(event)
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.router.unsubscribe(subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_pages_and_request_log() {
        let fetcher = MemoryFetcher::new();
        let topic = Topic::channel("general");
        fetcher.set_page(&topic, None, Page::new(vec![Message::new("b")], Some("b".into())));
        fetcher.set_page(&topic, Some("b"), Page::last(vec![Message::new("a")]));

        let head = fetcher.fetch_page("/api/messages", &topic, None).await.unwrap();
        let older = fetcher
            .fetch_page("/api/messages", &topic, head.next_cursor.as_ref())
            .await
            .unwrap();

        assert_eq!(older.items[0].id.as_str(), "a");
        let requests = fetcher.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].cursor, None);
        assert_eq!(requests[1].cursor, Some(Cursor::from("b")));
    }

    #[tokio::test]
    async fn test_unscripted_request_is_404() {
        let fetcher = MemoryFetcher::new();
        let err = fetcher
            .fetch_page("/api/messages", &Topic::channel("nope"), None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_hold_and_release() {
        let fetcher = MemoryFetcher::new();
        let topic = Topic::channel("general");
        fetcher.set_page(&topic, None, Page::default());
        fetcher.hold();

        let task = {
            let fetcher = Arc::clone(&fetcher);
            let topic = topic.clone();
            tokio::spawn(async move { fetcher.fetch_page("/api", &topic, None).await })
        };

        while fetcher.held_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(fetcher.request_count(), 1);
        assert!(!task.is_finished());

        fetcher.open();
        assert!(task.await.unwrap().is_ok());
    }

    #[test]
    fn test_live_channel_emit_and_connectivity() {
        let channel = MemoryLiveChannel::disconnected();
        assert!(!channel.is_connected());

        let mut sub = channel.subscribe("e");
        assert_eq!(channel.emit("e", Message::new("m1")), 1);
        assert!(sub.try_recv().is_some());

        channel.set_connected(true);
        assert!(channel.is_connected());

        channel.unsubscribe(sub);
        assert_eq!(channel.subscriber_count("e"), 0);
    }
}
