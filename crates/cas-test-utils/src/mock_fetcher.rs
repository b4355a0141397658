//! Scripted `Fetcher` for validator and retriever tests.
//!
//! Returns canned bodies or errors without any network, and records every
//! URL it was asked for so tests can assert on request construction.
//!
//! # Example
//!
//! ```rust,ignore
//! let fetcher = MockFetcher::sequence(vec![
//!     Err(FetchError::Status(503)),
//!     Ok(CasResponse::success("alice").to_xml()),
//! ]);
//! ```

use bytes::Bytes;
use cas_client::{FetchError, Fetcher};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

type Scripted = Result<String, FetchError>;

/// Mock fetcher with a scripted response sequence.
///
/// Responses are returned in order; the last one repeats once the script
/// runs out.
#[derive(Debug)]
pub struct MockFetcher {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Scripted>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Always answer with `body`.
    pub fn responding(body: impl Into<String>) -> Arc<Self> {
        Self::sequence(vec![Ok(body.into())])
    }

    /// Always fail with `error`.
    pub fn failing(error: FetchError) -> Arc<Self> {
        Self::sequence(vec![Err(error)])
    }

    /// Answer with each entry in turn, repeating the last.
    ///
    /// # Panics
    ///
    /// Panics if `script` is empty.
    pub fn sequence(script: Vec<Scripted>) -> Arc<Self> {
        let mut script: VecDeque<Scripted> = script.into();
        let last = script
            .pop_back()
            .expect("MockFetcher needs at least one response");

        Arc::new(Self {
            script: Mutex::new(script),
            last: Mutex::new(last),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Number of fetches performed.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every URL fetched, in order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recently fetched URL.
    pub fn last_url(&self) -> Option<String> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.lock().unwrap().clone());

        next.map(Bytes::from)
    }
}
