//! The client: one history fetcher and one live connection shared by every
//! open topic.

use std::sync::Arc;

use chatline_sync::{SyncConfig, Synchronizer, TopicBinding};
use chatline_transport::{
    Connectivity, HistoryFetcher, HttpFetcher, LiveChannel, ReconnectPolicy, WsLiveChannel,
};
use tokio::sync::watch;

use crate::error::Result;

/// Configuration for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the live event endpoint.
    pub live_url: String,
    /// Base URL that relative history endpoints resolve against.
    pub api_base: Option<String>,
    /// Synchronizer configuration, applied to every opened topic.
    pub sync: SyncConfig,
    /// Backoff for live channel reconnects.
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    /// Defaults for everything but the live endpoint.
    pub fn new(live_url: impl Into<String>) -> Self {
        Self {
            live_url: live_url.into(),
            api_base: None,
            sync: SyncConfig::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Entry point for applications.
///
/// Owns the transports; each [`open`](Self::open) spawns a synchronizer on
/// top of them. Any number of topics can be open at once, all multiplexed
/// over the same live connection.
pub struct ChatClient {
    fetcher: Arc<dyn HistoryFetcher>,
    live: Arc<dyn LiveChannel>,
    config: ClientConfig,
}

impl ChatClient {
    /// Create a client over existing transports.
    pub fn new(
        fetcher: Arc<dyn HistoryFetcher>,
        live: Arc<dyn LiveChannel>,
        config: ClientConfig,
    ) -> Self {
        Self {
            fetcher,
            live,
            config,
        }
    }

    /// Create a client over HTTP history and a WebSocket live channel.
    ///
    /// The live connection is established in the background. Must be called
    /// within a Tokio runtime.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let fetcher = match &config.api_base {
            Some(base) => HttpFetcher::new().with_base_url(base)?,
            None => HttpFetcher::new(),
        };
        let live = WsLiveChannel::connect(&config.live_url, config.reconnect.clone())?;

        tracing::info!(live_url = %config.live_url, "chat client created");
        Ok(Self::new(Arc::new(fetcher), Arc::new(live), config))
    }

    /// Start an unbound synchronizer.
    pub fn synchronizer(&self) -> Synchronizer {
        Synchronizer::spawn(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.live),
            self.config.sync.clone(),
        )
    }

    /// Start a synchronizer and bind it to `binding`.
    ///
    /// Resolves once the first page has loaded.
    pub async fn open(&self, binding: TopicBinding) -> Result<Synchronizer> {
        let sync = self.synchronizer();
        sync.bind_topic(binding).await?;
        Ok(sync)
    }

    /// Watch live channel connectivity.
    pub fn connectivity(&self) -> watch::Receiver<Connectivity> {
        self.live.connectivity()
    }

    /// Whether the live channel is currently connected.
    pub fn is_connected(&self) -> bool {
        self.live.is_connected()
    }

    /// The client's configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use chatline_transport::ChannelError;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new("wss://chat.test/live");
        assert_eq!(config.live_url, "wss://chat.test/live");
        assert!(config.api_base.is_none());
        assert_eq!(config.sync.poll_interval, SyncConfig::default().poll_interval);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_live_url() {
        let result = ChatClient::connect(ClientConfig::new("https://chat.test/live"));
        assert!(matches!(
            result,
            Err(ClientError::Channel(ChannelError::InvalidUrl(_)))
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_api_base() {
        let result = ChatClient::connect(ClientConfig {
            api_base: Some("not a url".into()),
            ..ClientConfig::new("ws://127.0.0.1:9/live")
        });
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }
}
