//! CAS response body builders.
//!
//! Produces the documents a CAS server returns from its validation and
//! proxy endpoints, so tests don't hand-write XML.
//!
//! # Example
//!
//! ```rust,ignore
//! let body = CasResponse::success("alice")
//!     .attribute("eduPersonAffiliation", "staff")
//!     .attribute("eduPersonAffiliation", "faculty")
//!     .pgt_iou("PGTIOU-1")
//!     .to_xml();
//! ```

/// CAS XML namespace.
pub const CAS_NAMESPACE: &str = "http://www.yale.edu/tp/cas";

/// Builder for CAS 2.0 / 3.0 validation responses.
#[derive(Debug, Clone)]
pub enum CasResponse {
    Success {
        user: String,
        attributes: Vec<(String, String)>,
        pgt_iou: Option<String>,
        proxies: Option<Vec<String>>,
    },
    Failure {
        code: String,
        message: String,
    },
}

impl CasResponse {
    /// `authenticationSuccess` for `user`.
    pub fn success(user: &str) -> Self {
        CasResponse::Success {
            user: user.to_string(),
            attributes: Vec::new(),
            pgt_iou: None,
            proxies: None,
        }
    }

    /// `authenticationFailure` with `code` and `message`.
    pub fn failure(code: &str, message: &str) -> Self {
        CasResponse::Failure {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// Add an attribute. Repeating a name produces a multi-valued attribute.
    #[must_use]
    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        if let CasResponse::Success { attributes, .. } = &mut self {
            attributes.push((name.to_string(), value.to_string()));
        }
        self
    }

    /// Add a `proxyGrantingTicket` (PGT-IOU) element.
    #[must_use]
    pub fn pgt_iou(mut self, iou: &str) -> Self {
        if let CasResponse::Success { pgt_iou, .. } = &mut self {
            *pgt_iou = Some(iou.to_string());
        }
        self
    }

    /// Add a `proxies` element listing `chain`, most recent proxy first.
    #[must_use]
    pub fn proxies(mut self, chain: &[&str]) -> Self {
        if let CasResponse::Success { proxies, .. } = &mut self {
            *proxies = Some(chain.iter().map(|p| (*p).to_string()).collect());
        }
        self
    }

    /// Render as a `cas:serviceResponse` document.
    pub fn to_xml(&self) -> String {
        let inner = match self {
            CasResponse::Success {
                user,
                attributes,
                pgt_iou,
                proxies,
            } => {
                let mut body = format!("<cas:user>{}</cas:user>", escape(user));

                if !attributes.is_empty() {
                    body.push_str("<cas:attributes>");
                    for (name, value) in attributes {
                        body.push_str(&format!("<cas:{name}>{}</cas:{name}>", escape(value)));
                    }
                    body.push_str("</cas:attributes>");
                }

                if let Some(iou) = pgt_iou {
                    body.push_str(&format!(
                        "<cas:proxyGrantingTicket>{}</cas:proxyGrantingTicket>",
                        escape(iou)
                    ));
                }

                if let Some(chain) = proxies {
                    body.push_str("<cas:proxies>");
                    for proxy in chain {
                        body.push_str(&format!("<cas:proxy>{}</cas:proxy>", escape(proxy)));
                    }
                    body.push_str("</cas:proxies>");
                }

                format!("<cas:authenticationSuccess>{body}</cas:authenticationSuccess>")
            }
            CasResponse::Failure { code, message } => format!(
                "<cas:authenticationFailure code=\"{}\">{}</cas:authenticationFailure>",
                escape(code),
                escape(message)
            ),
        };

        wrap(&inner)
    }
}

/// CAS 1.0 success body.
pub fn cas10_success(user: &str) -> String {
    format!("yes\n{user}\n")
}

/// CAS 1.0 failure body.
pub fn cas10_failure() -> String {
    "no\n\n".to_string()
}

/// `proxySuccess` document carrying `ticket`.
pub fn proxy_success(ticket: &str) -> String {
    wrap(&format!(
        "<cas:proxySuccess><cas:proxyTicket>{}</cas:proxyTicket></cas:proxySuccess>",
        escape(ticket)
    ))
}

/// `proxyFailure` document.
pub fn proxy_failure(code: &str, message: &str) -> String {
    wrap(&format!(
        "<cas:proxyFailure code=\"{}\">{}</cas:proxyFailure>",
        escape(code),
        escape(message)
    ))
}

fn wrap(inner: &str) -> String {
    format!("<cas:serviceResponse xmlns:cas=\"{CAS_NAMESPACE}\">\n  {inner}\n</cas:serviceResponse>")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
