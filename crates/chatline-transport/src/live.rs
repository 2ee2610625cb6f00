//! Live event channel abstraction.
//!
//! One connection is shared by every topic in the process and multiplexed
//! by event name. Delivery is at-least-once and unordered relative to
//! history fetches; subscribers must tolerate duplicates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};

use chatline_core::Message;

/// Whether the live channel currently has a working connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Connectivity {
    /// Check if connected.
    pub fn is_connected(self) -> bool {
        matches!(self, Connectivity::Connected)
    }
}

/// Identifies one registration on a live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A registration for one event name.
///
/// Messages published under the event name are queued here until read.
/// Dropping the subscription stops delivery; the channel prunes it lazily.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    event: String,
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl Subscription {
    /// The registration id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The event name this subscription listens on.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the channel has dropped this subscription.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Take a queued message without waiting.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}

/// A persistent, multiplexed live event connection.
pub trait LiveChannel: Send + Sync {
    /// Watch connectivity transitions.
    ///
    /// The receiver yields discrete changes; the current value is always
    /// available through `borrow()`.
    fn connectivity(&self) -> watch::Receiver<Connectivity>;

    /// Current connectivity.
    fn is_connected(&self) -> bool {
        self.connectivity().borrow().is_connected()
    }

    /// Register for messages published under `event`.
    fn subscribe(&self, event: &str) -> Subscription;

    /// Remove a registration. Queued, unread messages are discarded.
    fn unsubscribe(&self, subscription: Subscription);
}

struct Route {
    id: SubscriptionId,
    sender: mpsc::UnboundedSender<Message>,
}

/// Routes live messages to subscribers by event name and publishes
/// connectivity.
///
/// Every [`LiveChannel`] implementation in this crate is a thin shell around
/// a router: the connection feeds `dispatch` and `set_connectivity`,
/// consumers call `subscribe`.
pub struct EventRouter {
    routes: Mutex<HashMap<String, Vec<Route>>>,
    next_id: AtomicU64,
    connectivity: watch::Sender<Connectivity>,
}

impl EventRouter {
    /// Create a router with the given initial connectivity.
    pub fn new(initial: Connectivity) -> Self {
        let (connectivity, _) = watch::channel(initial);
        Self {
            routes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            connectivity,
        }
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<String, Vec<Route>>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new subscriber for `event`.
    pub fn subscribe(&self, event: &str) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();

        self.routes()
            .entry(event.to_owned())
            .or_default()
            .push(Route { id, sender });

        Subscription {
            id,
            event: event.to_owned(),
            receiver,
        }
    }

    /// Remove a registration. Returns false if it was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut routes = self.routes();
        let Some(subscribers) = routes.get_mut(&subscription.event) else {
            return false;
        };

        let before = subscribers.len();
        subscribers.retain(|route| route.id != subscription.id);
        let removed = subscribers.len() != before;

        if subscribers.is_empty() {
            routes.remove(&subscription.event);
        }
        removed
    }

    /// Deliver a message to every subscriber of `event`.
    ///
    /// Returns the number of subscribers reached. Subscribers whose
    /// receiving end was dropped are pruned.
    pub fn dispatch(&self, event: &str, message: Message) -> usize {
        let mut routes = self.routes();
        let Some(subscribers) = routes.get_mut(event) else {
            tracing::trace!(event, "live event with no subscribers");
            return 0;
        };

        subscribers.retain(|route| route.sender.send(message.clone()).is_ok());
        let delivered = subscribers.len();

        if subscribers.is_empty() {
            routes.remove(event);
        }
        delivered
    }

    /// Number of live registrations for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.routes().get(event).map_or(0, Vec::len)
    }

    /// Publish a connectivity change. Returns true if the value changed.
    pub fn set_connectivity(&self, state: Connectivity) -> bool {
        self.connectivity.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        })
    }

    /// Current connectivity.
    pub fn current(&self) -> Connectivity {
        *self.connectivity.borrow()
    }

    /// Watch connectivity transitions.
    pub fn connectivity(&self) -> watch::Receiver<Connectivity> {
        self.connectivity.subscribe()
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(Connectivity::Disconnected)
    }
}
