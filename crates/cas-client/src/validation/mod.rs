//! Ticket validation.
//!
//! # Components
//!
//! - `protocol` - CAS protocol versions and their endpoints
//! - `request` - Validation URL construction
//! - `parser` - Response parsing (plain-text CAS 1.0, XML CAS 2.0/3.0)
//! - `proxy_policy` - Allowed proxy chains for proxy ticket validation
//! - `validator` - The validation round-trip

pub mod parser;
pub mod protocol;
pub mod proxy_policy;
pub mod request;
pub mod validator;

pub use parser::ResponseParser;
pub use protocol::Protocol;
pub use proxy_policy::ProxyPolicy;
pub use request::ValidationRequest;
pub use validator::TicketValidator;

use crate::assertion::Attributes;

/// Parsed validation response.
///
/// Produced by [`ResponseParser`] and consumed immediately by
/// [`TicketValidator`]; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The server accepted the ticket.
    Success {
        principal_name: String,
        attributes: Attributes,
        /// Correlation handle for the PGT delivered to the callback URL.
        pgt_iou: Option<String>,
        /// `None` when the response had no proxy list element.
        proxies: Option<Vec<String>>,
    },

    /// The server refused the ticket, or the document was well-formed but
    /// not a recognizable envelope (`INVALID_RESPONSE`).
    Failure { code: String, message: String },
}

impl ValidationOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationOutcome::Success { .. })
    }
}
