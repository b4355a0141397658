//! Ticket validator.
//!
//! One call to [`TicketValidator::validate`] is one protocol round-trip:
//!
//! 1. Build the validation URL (ticket, service, renew, pgtUrl)
//! 2. Fetch it through the configured [`Fetcher`] (no retries)
//! 3. Parse the body with the protocol's [`ResponseParser`]
//! 4. Map a `Failure` outcome to [`TicketValidationError`]
//! 5. Check the proxy chain (proxy ticket validators only)
//! 6. Resolve the PGT-IOU against the PGT storage; a miss leaves the
//!    assertion without a PGT instead of failing
//!
//! The validator holds no mutable state and can be shared across tasks
//! behind an `Arc`.

use crate::assertion::{Assertion, AttributePrincipal};
use crate::config::{parse_server_url, CasClientConfig, ConfigError};
use crate::error::{TicketValidationError, INVALID_PROXY_CHAIN};
use crate::fetcher::Fetcher;
use crate::observability::metrics;
use crate::proxy::ProxyGrantingTicketStorage;
use crate::secret::SecretString;
use crate::validation::request::{endpoint_url, is_reserved_parameter, ValidationRequest};
use crate::validation::{Protocol, ProxyPolicy, ValidationOutcome};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Validates CAS service and proxy tickets.
#[derive(Clone)]
pub struct TicketValidator {
    /// Server URL prefix, e.g. `https://cas.example.org/cas`.
    server_url_prefix: Url,

    protocol: Protocol,

    /// Sent on every request; the server then refuses SSO-issued tickets.
    renew: bool,

    /// Callback URL the server delivers the PGT to.
    proxy_callback_url: Option<String>,

    custom_parameters: Vec<(String, String)>,

    /// `Some` validates at the proxy endpoint and enforces the policy.
    proxy_policy: Option<ProxyPolicy>,

    fetcher: Arc<dyn Fetcher>,

    pgt_storage: Option<Arc<dyn ProxyGrantingTicketStorage>>,
}

impl fmt::Debug for TicketValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketValidator")
            .field("server_url_prefix", &self.server_url_prefix.as_str())
            .field("protocol", &self.protocol)
            .field("renew", &self.renew)
            .field("proxy_callback_url", &self.proxy_callback_url)
            .field("custom_parameters", &self.custom_parameters)
            .field("proxy_policy", &self.proxy_policy)
            .field("pgt_storage", &self.pgt_storage.is_some())
            .finish_non_exhaustive()
    }
}

impl TicketValidator {
    /// Create a service ticket validator.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidServerUrl` if `server_url_prefix` is not
    /// an absolute `http`/`https` URL.
    pub fn new(
        server_url_prefix: &str,
        protocol: Protocol,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            server_url_prefix: parse_server_url(server_url_prefix)?,
            protocol,
            renew: false,
            proxy_callback_url: None,
            custom_parameters: Vec::new(),
            proxy_policy: None,
            fetcher,
            pgt_storage: None,
        })
    }

    /// Create a validator from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidServerUrl` for an unusable server URL.
    pub fn from_config(
        config: &CasClientConfig,
        fetcher: Arc<dyn Fetcher>,
        pgt_storage: Option<Arc<dyn ProxyGrantingTicketStorage>>,
    ) -> Result<Self, ConfigError> {
        let mut validator = Self::new(&config.server_url_prefix, config.protocol, fetcher)?
            .with_renew(config.renew);

        if let Some(callback) = &config.proxy_callback_url {
            validator = validator.with_proxy_callback_url(callback.clone());
        }

        if let Some(policy) = config.proxy_policy() {
            validator = validator.accepting_proxy_tickets(policy);
        }

        if let Some(storage) = pgt_storage {
            validator = validator.with_pgt_storage(storage);
        }

        Ok(validator)
    }

    /// Require primary authentication on every validation.
    #[must_use]
    pub fn with_renew(mut self, renew: bool) -> Self {
        self.renew = renew;
        self
    }

    /// Ask the server to deliver a PGT to `callback_url`.
    #[must_use]
    pub fn with_proxy_callback_url(mut self, callback_url: String) -> Self {
        self.proxy_callback_url = Some(callback_url);
        self
    }

    /// Storage the PGT callback writes into.
    #[must_use]
    pub fn with_pgt_storage(mut self, storage: Arc<dyn ProxyGrantingTicketStorage>) -> Self {
        self.pgt_storage = Some(storage);
        self
    }

    /// Extra query parameter sent with every validation request.
    ///
    /// Names the protocol already sends (`ticket`, `service`, `renew`,
    /// `pgtUrl`) are ignored with a warning.
    #[must_use]
    pub fn with_custom_parameter(mut self, name: String, value: String) -> Self {
        if is_reserved_parameter(&name) {
            warn!(
                target: "cas.validation",
                parameter = %name,
                "Ignoring custom parameter that shadows a protocol parameter"
            );
            return self;
        }
        self.custom_parameters.push((name, value));
        self
    }

    /// Validate at the proxy endpoint, accepting proxy tickets whose chain
    /// satisfies `policy`.
    #[must_use]
    pub fn accepting_proxy_tickets(mut self, policy: ProxyPolicy) -> Self {
        self.proxy_policy = Some(policy);
        self
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The URL a validation of `ticket` for `service` would fetch.
    #[must_use]
    pub fn validation_url(&self, ticket: &str, service: &str) -> String {
        let endpoint = endpoint_url(
            &self.server_url_prefix,
            self.protocol.endpoint_path(self.proxy_policy.is_some()),
        );

        let proxy_callback_url = if self.protocol.supports_proxying() {
            self.proxy_callback_url.as_deref()
        } else {
            None
        };

        ValidationRequest {
            ticket,
            service,
            renew: self.renew,
            proxy_callback_url,
            custom_parameters: &self.custom_parameters,
        }
        .to_url(&endpoint)
        .into()
    }

    /// Validate `ticket` for `service`.
    ///
    /// # Errors
    ///
    /// Returns `TicketValidationError` with:
    /// - the server's code when the ticket is rejected
    /// - `TRANSPORT_FAILURE` when the server cannot be reached
    /// - `INVALID_RESPONSE` when the response cannot be understood
    /// - `INVALID_PROXY_CHAIN` when a proxy chain is not allowed
    #[instrument(skip_all, fields(service = %service, protocol = %self.protocol))]
    pub async fn validate(
        &self,
        ticket: &str,
        service: &str,
    ) -> Result<Assertion, TicketValidationError> {
        let started = Instant::now();
        let result = self.validate_inner(ticket, service).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) if e.is_transport_failure() => "transport_error",
            Err(e) if e.is_invalid_response() => "invalid_response",
            Err(_) => "rejected",
        };
        metrics::record_validation(outcome, started.elapsed());

        result
    }

    async fn validate_inner(
        &self,
        ticket: &str,
        service: &str,
    ) -> Result<Assertion, TicketValidationError> {
        let url = self.validation_url(ticket, service);

        let body = self.fetcher.fetch(&url).await.map_err(|e| {
            warn!(target: "cas.validation", error = %e, "Failed to reach CAS server");
            TicketValidationError::from(e)
        })?;

        let outcome = self.protocol.parser().parse(&body).map_err(|e| {
            warn!(target: "cas.validation", error = %e, "Malformed CAS validation response");
            TicketValidationError::from(e)
        })?;

        match outcome {
            ValidationOutcome::Failure { code, message } => {
                info!(target: "cas.validation", code = %code, "Ticket rejected by CAS server");
                Err(TicketValidationError::new(code, message))
            }
            ValidationOutcome::Success {
                principal_name,
                attributes,
                pgt_iou,
                proxies,
            } => {
                if let (Some(policy), Some(chain)) = (&self.proxy_policy, &proxies) {
                    if !policy.is_allowed(chain) {
                        warn!(
                            target: "cas.validation",
                            proxy_count = chain.len(),
                            "Proxy chain not allowed"
                        );
                        return Err(TicketValidationError::new(
                            INVALID_PROXY_CHAIN,
                            format!("Proxy chain not allowed: {}", chain.join(" ")),
                        ));
                    }
                }

                let proxy_granting_ticket = match pgt_iou {
                    Some(iou) => self.resolve_pgt(&iou).await,
                    None => None,
                };

                debug!(
                    target: "cas.validation",
                    principal = %principal_name,
                    has_pgt = proxy_granting_ticket.is_some(),
                    "Ticket validated"
                );

                Ok(Assertion::new(
                    AttributePrincipal::new(principal_name, attributes),
                    proxy_granting_ticket,
                    proxies,
                ))
            }
        }
    }

    /// Look up the PGT for `iou`. Every failure degrades to `None`.
    async fn resolve_pgt(&self, iou: &str) -> Option<SecretString> {
        let Some(storage) = &self.pgt_storage else {
            warn!(
                target: "cas.validation",
                "Response carried a PGT-IOU but no PGT storage is configured"
            );
            metrics::record_pgt_resolution("no_storage");
            return None;
        };

        match storage.retrieve(iou).await {
            Ok(Some(pgt)) => {
                metrics::record_pgt_resolution("hit");
                Some(pgt)
            }
            Ok(None) => {
                warn!(
                    target: "cas.validation",
                    "No PGT saved for PGT-IOU, continuing without proxy support"
                );
                metrics::record_pgt_resolution("miss");
                None
            }
            Err(e) => {
                warn!(
                    target: "cas.validation",
                    error = %e,
                    "PGT storage lookup failed, continuing without proxy support"
                );
                metrics::record_pgt_resolution("error");
                None
            }
        }
    }
}
