//! Fetch capability used to talk to the CAS server.
//!
//! The validator and the proxy retriever only ever need "GET this URL and
//! give me the body". [`Fetcher`] is that seam; [`HttpFetcher`] is the
//! production implementation over `reqwest`. Retries, circuit breaking and
//! caching belong in wrappers around a `Fetcher`, not inside it.

use crate::error::FetchError;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Retrieve the raw body of a URL.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return the response body.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Transport` if the exchange could not complete and
    /// `FetchError::Status` for a non-2xx response.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// `reqwest`-backed fetcher.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeouts.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Transport` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a fetcher with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Transport` if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool, custom TLS roots).
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    // The URL carries the ticket, so it is never logged.
    #[instrument(skip_all)]
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            let e = e.without_url();
            warn!(target: "cas.fetcher", error = %e, "CAS request failed");
            FetchError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: "cas.fetcher", status = %status, "CAS server returned error status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            let e = e.without_url();
            warn!(target: "cas.fetcher", error = %e, "Failed to read CAS response body");
            FetchError::Transport(e.to_string())
        })?;

        debug!(target: "cas.fetcher", bytes = body.len(), "CAS response received");

        Ok(body)
    }
}

/// In-crate test double for [`Fetcher`].
#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Returns a fixed result and records every requested URL.
    pub(crate) struct StaticFetcher {
        response: Result<&'static str, FetchError>,
        requested: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub(crate) fn new(response: Result<&'static str, FetchError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                requested: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn body(body: &'static str) -> Arc<Self> {
            Self::new(Ok(body))
        }

        pub(crate) fn failing(error: FetchError) -> Arc<Self> {
            Self::new(Err(error))
        }

        pub(crate) fn call_count(&self) -> usize {
            self.requested.lock().unwrap().len()
        }

        pub(crate) fn last_url(&self) -> String {
            self.requested.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.response
                .clone()
                .map(|body| Bytes::from_static(body.as_bytes()))
        }
    }
}
