//! CAS client error types.
//!
//! [`TicketValidationError`] is the only error a validating caller needs to
//! handle: every negative outcome (server rejection, transport failure,
//! unparseable response, disallowed proxy chain) collapses into it with a
//! distinguishing `code`. The other types are raised by the collaborators
//! and converted at the validator boundary.

use thiserror::Error;

/// Code used when the response could not be parsed or was not a
/// recognizable success/failure envelope.
pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";

/// Code used when the fetcher could not complete the HTTP exchange.
pub const TRANSPORT_FAILURE: &str = "TRANSPORT_FAILURE";

/// Code used when a proxy ticket arrived through a chain that is not allowed.
pub const INVALID_PROXY_CHAIN: &str = "INVALID_PROXY_CHAIN";

/// Failure reported by a [`crate::Fetcher`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, TLS or read failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success HTTP status.
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),
}

/// The response bytes could not be turned into any recognizable document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedResponseError {
    /// Payload is not valid UTF-8.
    #[error("Response is not valid UTF-8")]
    InvalidEncoding,

    /// Payload is not a well-formed document.
    #[error("Response is not a well-formed document: {0}")]
    InvalidDocument(String),

    /// Success envelope without a non-blank principal name.
    #[error("Success response carries no principal name")]
    MissingPrincipal,
}

/// Ticket validation failed.
///
/// `code` is either the server-supplied failure code (`INVALID_TICKET`,
/// `INVALID_SERVICE`, ...) or one of [`INVALID_RESPONSE`],
/// [`TRANSPORT_FAILURE`] and [`INVALID_PROXY_CHAIN`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct TicketValidationError {
    pub code: String,
    pub message: String,
}

impl TicketValidationError {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The server could not be reached or answered with an error status.
    #[must_use]
    pub fn is_transport_failure(&self) -> bool {
        self.code == TRANSPORT_FAILURE
    }

    /// The server's answer could not be understood.
    #[must_use]
    pub fn is_invalid_response(&self) -> bool {
        self.code == INVALID_RESPONSE
    }

    /// The server understood the request and refused the ticket, or the
    /// proxy chain was refused locally.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !self.is_transport_failure() && !self.is_invalid_response()
    }
}

impl From<FetchError> for TicketValidationError {
    fn from(err: FetchError) -> Self {
        Self::new(TRANSPORT_FAILURE, err.to_string())
    }
}

impl From<MalformedResponseError> for TicketValidationError {
    fn from(err: MalformedResponseError) -> Self {
        Self::new(INVALID_RESPONSE, err.to_string())
    }
}

/// PGT storage failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The IOU was already saved; the first value is kept.
    #[error("PGT-IOU already correlated: {iou}")]
    DuplicateCorrelation { iou: String },

    /// Storage backend unavailable or returned an unexpected reply.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Proxy ticket retrieval failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    #[error("Transport error: {0}")]
    Transport(#[from] FetchError),

    #[error("Invalid proxy response: {0}")]
    InvalidResponse(String),

    /// The CAS server refused to issue a proxy ticket.
    #[error("Proxy ticket refused: {code}: {message}")]
    Rejected { code: String, message: String },
}

impl From<MalformedResponseError> for ProxyError {
    fn from(err: MalformedResponseError) -> Self {
        ProxyError::InvalidResponse(err.to_string())
    }
}
