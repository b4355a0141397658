//! Validated result of a ticket-validation call.
//!
//! An [`Assertion`] is only ever constructed from a successful validation.
//! It is immutable and owned by the caller.

use crate::error::ProxyError;
use crate::proxy::ProxyRetriever;
use crate::secret::SecretString;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Value of a released attribute.
///
/// An attribute name that appears more than once in the response becomes
/// `Multi`, preserving document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multi(Vec<String>),
}

impl AttributeValue {
    /// Add another value under the same name, promoting to `Multi`.
    pub fn push(&mut self, value: String) {
        match self {
            AttributeValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = AttributeValue::Multi(vec![first, value]);
            }
            AttributeValue::Multi(values) => values.push(value),
        }
    }

    /// First value in document order.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            AttributeValue::Single(value) => Some(value),
            AttributeValue::Multi(values) => values.first().map(String::as_str),
        }
    }

    /// All values in document order.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            AttributeValue::Single(value) => vec![value.as_str()],
            AttributeValue::Multi(values) => values.iter().map(String::as_str).collect(),
        }
    }

    #[must_use]
    pub fn is_multi(&self) -> bool {
        matches!(self, AttributeValue::Multi(_))
    }
}

impl PartialEq<str> for AttributeValue {
    fn eq(&self, other: &str) -> bool {
        matches!(self, AttributeValue::Single(value) if value == other)
    }
}

impl PartialEq<&str> for AttributeValue {
    fn eq(&self, other: &&str) -> bool {
        <Self as PartialEq<str>>::eq(self, other)
    }
}

/// Attribute map released by the CAS server.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Insert `value` under `name`, keeping earlier values for repeated names.
pub(crate) fn insert_attribute(attributes: &mut Attributes, name: String, value: String) {
    match attributes.get_mut(&name) {
        Some(existing) => existing.push(value),
        None => {
            attributes.insert(name, AttributeValue::Single(value));
        }
    }
}

/// The authenticated identity and its released attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributePrincipal {
    name: String,
    attributes: Attributes,
}

impl AttributePrincipal {
    #[must_use]
    pub fn new(name: String, attributes: Attributes) -> Self {
        Self { name, attributes }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

/// Validated ticket.
#[derive(Clone)]
pub struct Assertion {
    principal: AttributePrincipal,
    proxy_granting_ticket: Option<SecretString>,
    proxies: Option<Vec<String>>,
    valid_from: DateTime<Utc>,
}

impl fmt::Debug for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assertion")
            .field("principal", &self.principal)
            .field(
                "proxy_granting_ticket",
                &self.proxy_granting_ticket.as_ref().map(|_| "[REDACTED]"),
            )
            .field("proxies", &self.proxies)
            .field("valid_from", &self.valid_from)
            .finish()
    }
}

impl Assertion {
    /// Build an assertion.
    ///
    /// `proxies` is `None` when the response carried no proxy list at all
    /// and `Some(vec![])` when it carried an empty one.
    #[must_use]
    pub fn new(
        principal: AttributePrincipal,
        proxy_granting_ticket: Option<SecretString>,
        proxies: Option<Vec<String>>,
    ) -> Self {
        Self {
            principal,
            proxy_granting_ticket,
            proxies,
            valid_from: Utc::now(),
        }
    }

    #[must_use]
    pub fn principal(&self) -> &AttributePrincipal {
        &self.principal
    }

    /// Resolved PGT, if the callback delivered one before validation.
    #[must_use]
    pub fn proxy_granting_ticket(&self) -> Option<&SecretString> {
        self.proxy_granting_ticket.as_ref()
    }

    /// Services that proxied the authentication, in response order.
    /// Empty for service tickets.
    #[must_use]
    pub fn proxies(&self) -> &[String] {
        self.proxies.as_deref().unwrap_or_default()
    }

    /// Proxy list exactly as reported; `None` if the response had none.
    #[must_use]
    pub fn proxy_chain(&self) -> Option<&[String]> {
        self.proxies.as_deref()
    }

    #[must_use]
    pub fn valid_from(&self) -> DateTime<Utc> {
        self.valid_from
    }

    /// Obtain a proxy ticket for `target_service` using the resolved PGT.
    ///
    /// Returns `Ok(None)` when this assertion holds no PGT.
    ///
    /// # Errors
    ///
    /// Propagates the retriever's `ProxyError`.
    pub async fn proxy_ticket_for(
        &self,
        target_service: &str,
        retriever: &dyn ProxyRetriever,
    ) -> Result<Option<String>, ProxyError> {
        let Some(pgt) = self.proxy_granting_ticket.as_ref() else {
            debug!(
                target: "cas.proxy.retriever",
                principal = %self.principal.name,
                "No PGT held, cannot request proxy ticket"
            );
            return Ok(None);
        };

        retriever
            .proxy_ticket_for(pgt, target_service)
            .await
            .map(Some)
    }
}
