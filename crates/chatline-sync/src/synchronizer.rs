//! The consumer-facing synchronizer handle.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use chatline_core::Message;
use chatline_transport::{HistoryFetcher, LiveChannel};

use crate::actor::{Actor, Command};
use crate::binding::TopicBinding;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::status::{LoadMore, Refresh, Snapshot, SyncStatus};

/// Keeps one topic's message view consistent across history pages, live
/// events and degraded-mode polling.
///
/// Cheap reads (`current_view`, `status`, `snapshot`) never wait on the
/// background task. Mutating requests are queued and answered in order.
pub struct Synchronizer {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<Snapshot>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Synchronizer {
    /// Start a synchronizer task. Must be called within a Tokio runtime.
    pub fn spawn(
        fetcher: Arc<dyn HistoryFetcher>,
        live: Arc<dyn LiveChannel>,
        config: SyncConfig,
    ) -> Self {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let (snapshot_tx, snapshot) = watch::channel(Snapshot::idle(live.is_connected()));

        let (actor, inputs) = Actor::new(
            fetcher,
            live,
            config,
            snapshot_tx,
            commands,
            shutdown.clone(),
        );
        let task = tokio::spawn(actor.run(inputs));

        Self {
            commands: commands_tx,
            snapshot,
            shutdown,
            task: Some(task),
        }
    }

    /// Bind a topic, replacing any current binding.
    ///
    /// Live handlers for the new topic are registered before its first page
    /// is requested. Resolves once that page is loaded or has failed. A
    /// bind that is itself replaced before it resolves fails with
    /// [`SyncError::Superseded`].
    pub async fn bind_topic(&self, binding: TopicBinding) -> Result<()> {
        self.request(|reply| Command::Bind { binding, reply })
            .await?
    }

    /// Fetch the next older page.
    ///
    /// Returns [`LoadMore::Exhausted`] without any network activity when
    /// there is no older history. A failed fetch leaves the view and the
    /// cursor untouched so the request can simply be repeated.
    pub async fn request_more(&self) -> Result<LoadMore> {
        self.request(|reply| Command::RequestMore { reply }).await?
    }

    /// Re-fetch the head page if the view is stale, or retry a failed
    /// initial load.
    pub async fn refresh(&self) -> Result<Refresh> {
        self.request(|reply| Command::Refresh { reply }).await?
    }

    /// Drop the current binding and return to idle.
    pub async fn unbind(&self) -> Result<()> {
        self.request(|reply| Command::Unbind { reply }).await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| SyncError::Closed)?;
        response.await.map_err(|_| SyncError::Closed)
    }

    /// The flattened view, newest first.
    pub fn current_view(&self) -> Arc<[Message]> {
        Arc::clone(&self.snapshot.borrow().messages)
    }

    /// Current lifecycle state.
    pub fn status(&self) -> SyncStatus {
        self.snapshot.borrow().status
    }

    /// Everything about the current view at once.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch the view change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_until(&self, predicate: impl FnMut(&Snapshot) -> bool) -> Result<Snapshot> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx.wait_for(predicate).await.map_err(|_| SyncError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Stop the task, unsubscribing from the live channel.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "synchronizer task ended abnormally");
            }
        }
    }
}

impl fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot.borrow();
        f.debug_struct("Synchronizer")
            .field("topic", &snapshot.topic)
            .field("status", &snapshot.status)
            .field("messages", &snapshot.messages.len())
            .finish()
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
