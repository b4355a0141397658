//! Proxy ticket retrieval.
//!
//! A service holding a PGT asks the CAS server for a proxy ticket valid for
//! another (target) service:
//!
//! ```text
//! GET {prefix}/proxy?pgt={pgt}&targetService={target}
//! ```
//!
//! The answer is a `proxySuccess` envelope carrying the ticket or a
//! `proxyFailure` envelope with a code and message.

use crate::config::{parse_server_url, ConfigError};
use crate::error::{MalformedResponseError, ProxyError};
use crate::fetcher::Fetcher;
use crate::observability::metrics;
use crate::secret::{ExposeSecret, SecretString};
use crate::validation::parser::{child_element, element_text, envelope, parse_document};
use crate::validation::request::endpoint_url;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// Obtains proxy tickets using a PGT.
#[async_trait::async_trait]
pub trait ProxyRetriever: Send + Sync {
    /// Request a proxy ticket for `target_service`.
    ///
    /// # Errors
    ///
    /// Returns `ProxyError` if the server cannot be reached, refuses the
    /// PGT or target service, or answers with something unrecognizable.
    async fn proxy_ticket_for(
        &self,
        pgt: &SecretString,
        target_service: &str,
    ) -> Result<String, ProxyError>;
}

/// Retriever speaking the CAS 2.0 `proxy` endpoint (also used by CAS 3.0).
pub struct Cas20ProxyRetriever {
    server_url_prefix: Url,
    fetcher: Arc<dyn Fetcher>,
}

impl Cas20ProxyRetriever {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidServerUrl` if `server_url_prefix` is not
    /// an absolute `http`/`https` URL.
    pub fn new(server_url_prefix: &str, fetcher: Arc<dyn Fetcher>) -> Result<Self, ConfigError> {
        Ok(Self {
            server_url_prefix: parse_server_url(server_url_prefix)?,
            fetcher,
        })
    }

    fn proxy_url(&self, pgt: &SecretString, target_service: &str) -> String {
        let mut url = endpoint_url(&self.server_url_prefix, "proxy");
        url.query_pairs_mut()
            .append_pair("pgt", pgt.expose_secret())
            .append_pair("targetService", target_service);
        url.into()
    }
}

#[async_trait::async_trait]
impl ProxyRetriever for Cas20ProxyRetriever {
    #[instrument(skip_all, fields(target_service = %target_service))]
    async fn proxy_ticket_for(
        &self,
        pgt: &SecretString,
        target_service: &str,
    ) -> Result<String, ProxyError> {
        let url = self.proxy_url(pgt, target_service);

        let result = match self.fetcher.fetch(&url).await {
            Ok(body) => parse_proxy_response(&body),
            Err(e) => {
                warn!(target: "cas.proxy.retriever", error = %e, "Failed to reach CAS server");
                Err(ProxyError::from(e))
            }
        };

        let outcome = match &result {
            Ok(_) => "success",
            Err(ProxyError::Rejected { .. }) => "rejected",
            Err(ProxyError::Transport(_)) => "transport_error",
            Err(ProxyError::InvalidResponse(_)) => "invalid_response",
        };
        metrics::record_proxy_ticket_request(outcome);

        match &result {
            Ok(_) => debug!(target: "cas.proxy.retriever", "Proxy ticket issued"),
            Err(e) => warn!(target: "cas.proxy.retriever", error = %e, "Proxy ticket request failed"),
        }

        result
    }
}

fn parse_proxy_response(raw: &[u8]) -> Result<String, ProxyError> {
    let text = std::str::from_utf8(raw).map_err(|_| MalformedResponseError::InvalidEncoding)?;
    let doc = parse_document(text)?;

    let Some(envelope) = envelope(&doc) else {
        return Err(ProxyError::InvalidResponse(
            "empty service response".to_string(),
        ));
    };

    match envelope.tag_name().name() {
        "proxySuccess" => {
            let ticket = child_element(envelope, "proxyTicket")
                .map(element_text)
                .filter(|ticket| !ticket.is_empty())
                .ok_or_else(|| {
                    ProxyError::InvalidResponse("proxySuccess without a proxyTicket".to_string())
                })?;
            Ok(ticket)
        }
        "proxyFailure" => Err(ProxyError::Rejected {
            code: envelope
                .attribute("code")
                .map_or_else(|| "UNKNOWN".to_string(), |c| c.trim().to_string()),
            message: element_text(envelope),
        }),
        other => Err(ProxyError::InvalidResponse(format!(
            "unexpected element '{other}'"
        ))),
    }
}
