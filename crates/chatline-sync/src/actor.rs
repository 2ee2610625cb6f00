//! The task behind a [`Synchronizer`](crate::Synchronizer) handle.
//!
//! The actor is the only owner of the page cache. Everything that can
//! change the cache arrives as an [`Event`] and is handled to completion
//! before the next one is looked at. Fetches are the only suspending work;
//! they run in their own tasks and report back as completions tagged with
//! the binding generation that issued them.

use std::future::pending;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use chatline_core::{Cursor, MergeOutcome, Message, Page, PageCache, Topic, UpdateOutcome};
use chatline_transport::{Connectivity, HistoryFetcher, LiveChannel, Subscription, TransportError};

use crate::binding::TopicBinding;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::status::{LoadMore, Refresh, Snapshot, SyncStatus};

/// Requests from the handle.
pub(crate) enum Command {
    Bind {
        binding: TopicBinding,
        reply: oneshot::Sender<Result<()>>,
    },
    RequestMore {
        reply: oneshot::Sender<Result<LoadMore>>,
    },
    Refresh {
        reply: oneshot::Sender<Result<Refresh>>,
    },
    Unbind {
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    /// First page of a binding, or a retry after it failed.
    Initial,
    /// Older history.
    More,
    /// Head page while disconnected.
    Poll,
    /// Head page on consumer request.
    Refresh,
    /// Head page after reconnecting with a stale view.
    CatchUp,
}

struct Completion {
    generation: u64,
    kind: FetchKind,
    result: std::result::Result<Page, TransportError>,
}

enum Event {
    Command(Command),
    Completion(Completion),
    Created(Option<Message>),
    Updated(Option<Message>),
    ConnectivityChanged,
    ConnectivityGone,
    PollTick,
    Shutdown,
}

/// State of the currently bound topic.
struct Bound {
    binding: TopicBinding,
    cache: PageCache,
    status: SyncStatus,
    created: Option<Subscription>,
    updated: Option<Subscription>,
    /// Cancels this binding's in-flight fetches.
    cancel: CancellationToken,
    poll: Option<Interval>,
    /// Initial, poll, refresh or catch-up fetch outstanding.
    head_in_flight: bool,
    last_head_fetch: Option<Instant>,
    last_error: Option<String>,
    pending_bind: Option<oneshot::Sender<Result<()>>>,
    pending_more: Option<oneshot::Sender<Result<LoadMore>>>,
    pending_refresh: Option<oneshot::Sender<Result<Refresh>>>,
}

impl Bound {
    fn is_stale(&self, window: std::time::Duration) -> bool {
        self.last_head_fetch
            .map_or(true, |fetched| fetched.elapsed() >= window)
    }
}

pub(crate) struct Actor {
    fetcher: Arc<dyn HistoryFetcher>,
    live: Arc<dyn LiveChannel>,
    config: SyncConfig,
    snapshot: watch::Sender<Snapshot>,
    completions: mpsc::UnboundedSender<Completion>,
    shutdown: CancellationToken,
    connected: bool,
    generation: u64,
    bound: Option<Bound>,
}

/// Inputs the actor loop selects over that must not be borrowed from `Actor`.
pub(crate) struct Inputs {
    commands: mpsc::UnboundedReceiver<Command>,
    completions: mpsc::UnboundedReceiver<Completion>,
    connectivity: watch::Receiver<Connectivity>,
}

impl Actor {
    pub(crate) fn new(
        fetcher: Arc<dyn HistoryFetcher>,
        live: Arc<dyn LiveChannel>,
        config: SyncConfig,
        snapshot: watch::Sender<Snapshot>,
        commands: mpsc::UnboundedReceiver<Command>,
        shutdown: CancellationToken,
    ) -> (Self, Inputs) {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let mut connectivity = live.connectivity();
        let connected = connectivity.borrow_and_update().is_connected();

        let actor = Self {
            fetcher,
            live,
            config,
            snapshot,
            completions: completions_tx,
            shutdown,
            connected,
            generation: 0,
            bound: None,
        };
        let inputs = Inputs {
            commands,
            completions,
            connectivity,
        };
        (actor, inputs)
    }

    pub(crate) async fn run(mut self, mut inputs: Inputs) {
        let shutdown = self.shutdown.clone();
        let mut connectivity_open = true;
        self.publish();

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => Event::Shutdown,
                command = inputs.commands.recv() => match command {
                    Some(command) => Event::Command(command),
                    None => Event::Shutdown,
                },
                Some(done) = inputs.completions.recv() => Event::Completion(done),
                changed = inputs.connectivity.changed(), if connectivity_open => match changed {
                    Ok(()) => Event::ConnectivityChanged,
                    Err(_) => Event::ConnectivityGone,
                },
                event = next_bound_event(&mut self.bound) => event,
            };

            match event {
                Event::Shutdown => break,
                Event::Command(command) => self.on_command(command),
                Event::Completion(done) => self.on_completion(done),
                Event::Created(message) => self.on_created(message),
                Event::Updated(message) => self.on_updated(message),
                Event::ConnectivityChanged => {
                    let connected = inputs.connectivity.borrow_and_update().is_connected();
                    self.on_connectivity(connected);
                }
                Event::ConnectivityGone => {
                    tracing::warn!("live channel dropped its connectivity feed; treating as disconnected");
                    connectivity_open = false;
                    self.on_connectivity(false);
                }
                Event::PollTick => self.on_poll_tick(),
            }
        }

        self.release_binding(|_| SyncError::Closed);
        self.publish();
        tracing::debug!("synchronizer stopped");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Bind { binding, reply } => self.bind(binding, reply),
            Command::RequestMore { reply } => self.request_more(reply),
            Command::Refresh { reply } => self.refresh(reply),
            Command::Unbind { reply } => {
                self.release_binding(|_| SyncError::NotBound);
                self.publish();
                let _ = reply.send(());
            }
        }
    }

    fn bind(&mut self, binding: TopicBinding, reply: oneshot::Sender<Result<()>>) {
        // Old handlers go before new ones are registered.
        self.release_binding(|topic| SyncError::Superseded(topic.clone()));
        self.generation += 1;

        tracing::info!(topic = %binding.topic, generation = self.generation, "binding topic");

        let created = self.live.subscribe(&binding.events.created);
        let updated = self.live.subscribe(&binding.events.updated);

        self.bound = Some(Bound {
            binding,
            cache: PageCache::new(),
            status: SyncStatus::Loading,
            created: Some(created),
            updated: Some(updated),
            cancel: self.shutdown.child_token(),
            poll: None,
            head_in_flight: true,
            last_head_fetch: None,
            last_error: None,
            pending_bind: Some(reply),
            pending_more: None,
            pending_refresh: None,
        });

        self.spawn_fetch(FetchKind::Initial, None);
        self.sync_polling();
        self.publish();
    }

    fn request_more(&mut self, reply: oneshot::Sender<Result<LoadMore>>) {
        let Some(bound) = self.bound.as_mut() else {
            let _ = reply.send(Err(SyncError::NotBound));
            return;
        };

        let cursor = match bound.status {
            SyncStatus::Ready => bound.cache.next_cursor().cloned(),
            SyncStatus::LoadingMore => {
                let _ = reply.send(Err(SyncError::LoadInFlight));
                return;
            }
            SyncStatus::Idle | SyncStatus::Loading | SyncStatus::Error => {
                let _ = reply.send(Err(SyncError::NotReady));
                return;
            }
        };

        let Some(cursor) = cursor else {
            tracing::trace!(topic = %bound.binding.topic, "no older history");
            let _ = reply.send(Ok(LoadMore::Exhausted));
            return;
        };

        bound.status = SyncStatus::LoadingMore;
        bound.pending_more = Some(reply);
        self.spawn_fetch(FetchKind::More, Some(cursor));
        self.publish();
    }

    fn refresh(&mut self, reply: oneshot::Sender<Result<Refresh>>) {
        let stale_after = self.config.stale_after;
        let Some(bound) = self.bound.as_mut() else {
            let _ = reply.send(Err(SyncError::NotBound));
            return;
        };

        let kind = match bound.status {
            SyncStatus::Idle | SyncStatus::Loading => {
                let _ = reply.send(Err(SyncError::NotReady));
                return;
            }
            SyncStatus::Error => {
                bound.status = SyncStatus::Loading;
                FetchKind::Initial
            }
            SyncStatus::Ready | SyncStatus::LoadingMore => {
                if bound.head_in_flight {
                    let _ = reply.send(Err(SyncError::LoadInFlight));
                    return;
                }
                if !bound.is_stale(stale_after) {
                    let _ = reply.send(Ok(Refresh::Fresh));
                    return;
                }
                FetchKind::Refresh
            }
        };

        bound.head_in_flight = true;
        bound.pending_refresh = Some(reply);
        self.spawn_fetch(kind, None);
        self.publish();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fetches
    // ─────────────────────────────────────────────────────────────────────────

    fn spawn_fetch(&self, kind: FetchKind, cursor: Option<Cursor>) {
        let Some(bound) = &self.bound else {
            return;
        };

        let fetcher = Arc::clone(&self.fetcher);
        let endpoint = bound.binding.endpoint.clone();
        let topic = bound.binding.topic.clone();
        let cancel = bound.cancel.clone();
        let completions = self.completions.clone();
        let generation = self.generation;

        tracing::debug!(%topic, ?kind, cursor = ?cursor, "issuing history fetch");

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = fetcher.fetch_page(&endpoint, &topic, cursor.as_ref()) => result,
            };
            let _ = completions.send(Completion {
                generation,
                kind,
                result,
            });
        });
    }

    fn on_completion(&mut self, done: Completion) {
        if done.generation != self.generation {
            tracing::debug!(
                generation = done.generation,
                current = self.generation,
                "discarding fetch for superseded binding"
            );
            return;
        }
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        let topic = &bound.binding.topic;

        match (done.kind, done.result) {
            (FetchKind::Initial, Ok(page)) => {
                bound.head_in_flight = false;
                let outcome = bound.cache.append_older_page(page);
                bound.status = SyncStatus::Ready;
                bound.last_head_fetch = Some(Instant::now());
                bound.last_error = None;
                tracing::info!(%topic, messages = outcome.appended, "initial page loaded");

                if let Some(reply) = bound.pending_bind.take() {
                    let _ = reply.send(Ok(()));
                }
                if let Some(reply) = bound.pending_refresh.take() {
                    let _ = reply.send(Ok(Refresh::Reloaded));
                }
            }
            (FetchKind::Initial, Err(e)) => {
                bound.head_in_flight = false;
                bound.status = SyncStatus::Error;
                bound.last_error = Some(e.to_string());
                tracing::warn!(%topic, error = %e, "initial load failed");

                if let Some(reply) = bound.pending_bind.take() {
                    let _ = reply.send(Err(e.clone().into()));
                }
                if let Some(reply) = bound.pending_refresh.take() {
                    let _ = reply.send(Err(e.into()));
                }
            }
            (FetchKind::More, result) => {
                bound.status = SyncStatus::Ready;
                let reply: Result<LoadMore> = match result {
                    Ok(page) => {
                        let outcome = bound.cache.append_older_page(page);
                        tracing::debug!(%topic, appended = outcome.appended, "older page appended");
                        Ok(LoadMore::Loaded {
                            appended: outcome.appended,
                        })
                    }
                    Err(e) => {
                        tracing::warn!(%topic, error = %e, "load more failed");
                        Err(e.into())
                    }
                };
                if let Some(pending) = bound.pending_more.take() {
                    let _ = pending.send(reply);
                }
            }
            (FetchKind::Refresh, result) => {
                bound.head_in_flight = false;
                let reply: Result<Refresh> = match result {
                    Ok(page) => {
                        bound.last_head_fetch = Some(Instant::now());
                        Ok(Refresh::Merged(bound.cache.merge_head_page(page)))
                    }
                    Err(e) => {
                        tracing::warn!(%topic, error = %e, "refresh failed");
                        Err(e.into())
                    }
                };
                if let Some(pending) = bound.pending_refresh.take() {
                    let _ = pending.send(reply);
                }
            }
            (kind @ (FetchKind::Poll | FetchKind::CatchUp), result) => {
                bound.head_in_flight = false;
                match result {
                    Ok(page) => {
                        bound.last_head_fetch = Some(Instant::now());
                        let outcome = bound.cache.merge_head_page(page);
                        if outcome.changed() {
                            tracing::debug!(
                                %topic,
                                ?kind,
                                inserted = outcome.inserted,
                                already_present = outcome.already_present,
                                "head page merged"
                            );
                        }
                    }
                    Err(e) => tracing::warn!(%topic, ?kind, error = %e, "head fetch failed"),
                }
            }
        }

        self.publish();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Live events
    // ─────────────────────────────────────────────────────────────────────────

    fn on_created(&mut self, message: Option<Message>) {
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        let Some(message) = message else {
            tracing::warn!(topic = %bound.binding.topic, "created-event subscription closed");
            bound.created = None;
            return;
        };

        if bound.cache.merge_created(message) == MergeOutcome::Inserted {
            self.publish();
        }
    }

    fn on_updated(&mut self, message: Option<Message>) {
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        let Some(message) = message else {
            tracing::warn!(topic = %bound.binding.topic, "updated-event subscription closed");
            bound.updated = None;
            return;
        };

        if bound.cache.apply_updated(message) == UpdateOutcome::Replaced {
            self.publish();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connectivity and polling
    // ─────────────────────────────────────────────────────────────────────────

    fn on_connectivity(&mut self, connected: bool) {
        if connected == self.connected {
            return;
        }
        self.connected = connected;
        tracing::info!(connected, "live channel connectivity changed");

        self.sync_polling();

        let stale_after = self.config.stale_after;
        let catch_up = self.bound.as_ref().is_some_and(|bound| {
            connected
                && bound.status.is_ready()
                && !bound.head_in_flight
                && bound.is_stale(stale_after)
        });
        if catch_up {
            if let Some(bound) = self.bound.as_mut() {
                bound.head_in_flight = true;
            }
            self.spawn_fetch(FetchKind::CatchUp, None);
        }

        self.publish();
    }

    /// Poll exactly while a topic is bound and the channel is down.
    fn sync_polling(&mut self) {
        let connected = self.connected;
        let period = self.config.poll_interval;
        let Some(bound) = self.bound.as_mut() else {
            return;
        };

        match (connected, bound.poll.is_some()) {
            (false, false) => {
                let mut poll = interval_at(Instant::now() + period, period);
                poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
                bound.poll = Some(poll);
                tracing::debug!(topic = %bound.binding.topic, ?period, "polling started");
            }
            (true, true) => {
                bound.poll = None;
                tracing::debug!(topic = %bound.binding.topic, "polling stopped");
            }
            _ => {}
        }
    }

    fn on_poll_tick(&mut self) {
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        if self.connected || bound.head_in_flight {
            return;
        }

        let kind = match bound.status {
            SyncStatus::Ready | SyncStatus::LoadingMore => FetchKind::Poll,
            SyncStatus::Error => {
                bound.status = SyncStatus::Loading;
                FetchKind::Initial
            }
            SyncStatus::Idle | SyncStatus::Loading => return,
        };

        bound.head_in_flight = true;
        self.spawn_fetch(kind, None);
        if kind == FetchKind::Initial {
            self.publish();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Drop the current binding: cancel its fetches, unsubscribe its
    /// handlers and fail any waiting consumer.
    fn release_binding(&mut self, reason: impl Fn(&Topic) -> SyncError) {
        let Some(bound) = self.bound.take() else {
            return;
        };

        bound.cancel.cancel();
        if let Some(subscription) = bound.created {
            self.live.unsubscribe(subscription);
        }
        if let Some(subscription) = bound.updated {
            self.live.unsubscribe(subscription);
        }

        let topic = &bound.binding.topic;
        if let Some(reply) = bound.pending_bind {
            let _ = reply.send(Err(reason(topic)));
        }
        if let Some(reply) = bound.pending_more {
            let _ = reply.send(Err(reason(topic)));
        }
        if let Some(reply) = bound.pending_refresh {
            let _ = reply.send(Err(reason(topic)));
        }

        tracing::debug!(%topic, "binding released");
    }

    fn publish(&self) {
        let snapshot = match &self.bound {
            None => Snapshot::idle(self.connected),
            Some(bound) => Snapshot {
                topic: Some(bound.binding.topic.clone()),
                status: bound.status,
                messages: Arc::from(bound.cache.flatten_view()),
                has_more: bound.cache.has_more(),
                connected: self.connected,
                last_error: bound.last_error.clone(),
            },
        };
        self.snapshot.send_replace(snapshot);
    }
}

/// Next live event or poll tick of the bound topic; pending while unbound.
async fn next_bound_event(bound: &mut Option<Bound>) -> Event {
    let Some(bound) = bound else {
        return pending().await;
    };

    tokio::select! {
        message = recv_live(&mut bound.created) => Event::Created(message),
        message = recv_live(&mut bound.updated) => Event::Updated(message),
        _ = tick(&mut bound.poll) => Event::PollTick,
    }
}

async fn recv_live(subscription: &mut Option<Subscription>) -> Option<Message> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => pending().await,
    }
}

async fn tick(poll: &mut Option<Interval>) {
    match poll {
        Some(poll) => {
            poll.tick().await;
        }
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_transport::{MemoryFetcher, MemoryLiveChannel};

    fn actor(fetcher: Arc<MemoryFetcher>) -> (Actor, watch::Receiver<Snapshot>) {
        let (snapshot_tx, snapshot) = watch::channel(Snapshot::idle(true));
        let (_commands_tx, commands) = mpsc::unbounded_channel();
        let (actor, _inputs) = Actor::new(
            fetcher,
            MemoryLiveChannel::new(),
            SyncConfig::default(),
            snapshot_tx,
            commands,
            CancellationToken::new(),
        );
        (actor, snapshot)
    }

    fn bind(actor: &mut Actor, topic: &Topic) -> oneshot::Receiver<Result<()>> {
        let (reply, response) = oneshot::channel();
        actor.on_command(Command::Bind {
            binding: TopicBinding::new(topic.clone(), "/api/messages"),
            reply,
        });
        response
    }

    fn initial(generation: u64, ids: &[&str]) -> Completion {
        Completion {
            generation,
            kind: FetchKind::Initial,
            result: Ok(Page::last(ids.iter().map(|id| Message::new(*id)).collect())),
        }
    }

    #[tokio::test]
    async fn test_completion_queued_before_rebind_is_discarded() {
        let fetcher = MemoryFetcher::new();
        fetcher.hold();
        let (mut actor, snapshot) = actor(fetcher);
        let general = Topic::channel("general");
        let random = Topic::channel("random");

        let mut first = bind(&mut actor, &general);
        let old_generation = actor.generation;
        let late = initial(old_generation, &["g1"]);

        let mut second = bind(&mut actor, &random);
        assert_eq!(
            first.try_recv(),
            Ok(Err(SyncError::Superseded(general.clone())))
        );

        // The general page was already on its way when the rebind ran.
        actor.on_completion(late);
        let bound = actor.bound.as_ref().unwrap();
        assert_eq!(bound.binding.topic, random);
        assert_eq!(bound.status, SyncStatus::Loading);
        assert!(bound.cache.is_empty());
        assert!(second.try_recv().is_err());
        assert!(snapshot.borrow().messages.is_empty());

        actor.on_completion(initial(actor.generation, &["r1"]));
        assert_eq!(second.try_recv(), Ok(Ok(())));
        assert_eq!(snapshot.borrow().ids(), vec!["r1"]);
    }

    #[tokio::test]
    async fn test_refresh_while_loading_is_not_ready() {
        let fetcher = MemoryFetcher::new();
        fetcher.hold();
        let (mut actor, _snapshot) = actor(fetcher);
        let _bind = bind(&mut actor, &Topic::channel("general"));

        let (reply, mut response) = oneshot::channel();
        actor.on_command(Command::Refresh { reply });
        assert_eq!(response.try_recv(), Ok(Err(SyncError::NotReady)));

        let (reply, mut response) = oneshot::channel();
        actor.on_command(Command::RequestMore { reply });
        assert_eq!(response.try_recv(), Ok(Err(SyncError::NotReady)));
    }
}
