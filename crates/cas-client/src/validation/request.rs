//! Validation request URL construction.
//!
//! Query parameters are form-urlencoded: `ticket`, `service`, then
//! `renew=true` and `pgtUrl` when configured, then any custom parameters.
//! Custom parameters may not reuse those four names.
//! The `service` value must be byte-identical to what the CAS server
//! recorded when issuing the ticket, so it is passed through unmodified
//! apart from encoding.

use url::Url;

/// Parameter names owned by the validation protocol.
pub const RESERVED_PARAMETERS: [&str; 4] = ["ticket", "service", "renew", "pgtUrl"];

/// Whether `name` collides with a protocol parameter.
#[must_use]
pub fn is_reserved_parameter(name: &str) -> bool {
    RESERVED_PARAMETERS.contains(&name)
}

/// One validation round-trip's request parameters.
#[derive(Debug, Clone, Copy)]
pub struct ValidationRequest<'a> {
    pub ticket: &'a str,
    pub service: &'a str,
    /// Force primary authentication (no SSO session reuse).
    pub renew: bool,
    pub proxy_callback_url: Option<&'a str>,
    pub custom_parameters: &'a [(String, String)],
}

impl<'a> ValidationRequest<'a> {
    #[must_use]
    pub fn new(ticket: &'a str, service: &'a str) -> Self {
        Self {
            ticket,
            service,
            renew: false,
            proxy_callback_url: None,
            custom_parameters: &[],
        }
    }

    /// Append this request's parameters to `endpoint`.
    #[must_use]
    pub fn to_url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("ticket", self.ticket);
            query.append_pair("service", self.service);

            if self.renew {
                query.append_pair("renew", "true");
            }

            if let Some(callback) = self.proxy_callback_url {
                query.append_pair("pgtUrl", callback);
            }

            for (name, value) in self.custom_parameters {
                if !is_reserved_parameter(name) {
                    query.append_pair(name, value);
                }
            }
        }
        url
    }
}

/// Resolve `path` (which may contain `/`) beneath `prefix`.
///
/// `prefix` must be a base URL (`http`/`https`); the caller checks this when
/// the prefix is configured.
#[must_use]
pub fn endpoint_url(prefix: &Url, path: &str) -> Url {
    let mut url = prefix.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(path.split('/'));
    }
    url
}
