//! HTTP implementation of the history fetcher.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use chatline_core::{Cursor, Page, Topic};

use crate::error::{Result, TransportError};
use crate::fetch::{history_query, HistoryFetcher};

/// Fetches history pages with a GET request per page.
///
/// Endpoints may be absolute, or relative to an optional base URL.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
    base_url: Option<Url>,
}

impl HttpFetcher {
    /// Create a fetcher with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fetcher around an existing client (shared pool, custom headers).
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Resolve relative endpoints such as `/api/messages` against `base`.
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        self.base_url = Some(Url::parse(base)?);
        Ok(self)
    }

    /// Build the full request URL for one page.
    pub fn request_url(&self, endpoint: &str, topic: &Topic, cursor: Option<&Cursor>) -> Result<Url> {
        let mut url = match (Url::parse(endpoint), &self.base_url) {
            (Ok(url), _) => url,
            (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => base.join(endpoint)?,
            (Err(err), _) => return Err(err.into()),
        };
        url.query_pairs_mut().extend_pairs(history_query(topic, cursor));
        Ok(url)
    }
}

#[async_trait]
impl HistoryFetcher for HttpFetcher {
    async fn fetch_page(
        &self,
        endpoint: &str,
        topic: &Topic,
        cursor: Option<&Cursor>,
    ) -> Result<Page> {
        let url = self.request_url(endpoint, topic, cursor)?;
        tracing::debug!(%url, "fetching history page");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%topic, status = status.as_u16(), "history request failed");
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<Page>().await?)
    }
}
