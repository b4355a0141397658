//! CAS protocol versions.

use crate::validation::ResponseParser;
use std::fmt;
use std::str::FromStr;

/// CAS protocol version spoken with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Plain-text `validate` endpoint. No attributes, no proxying.
    Cas10,
    /// XML `serviceValidate` / `proxyValidate` endpoints.
    #[default]
    Cas20,
    /// XML `p3/serviceValidate` / `p3/proxyValidate` endpoints (attributes
    /// released by default).
    Cas30,
}

impl Protocol {
    /// Endpoint path relative to the server URL prefix.
    #[must_use]
    pub fn endpoint_path(self, proxy_tickets: bool) -> &'static str {
        match (self, proxy_tickets) {
            (Protocol::Cas10, _) => "validate",
            (Protocol::Cas20, false) => "serviceValidate",
            (Protocol::Cas20, true) => "proxyValidate",
            (Protocol::Cas30, false) => "p3/serviceValidate",
            (Protocol::Cas30, true) => "p3/proxyValidate",
        }
    }

    /// Parser variant for this protocol's response format.
    #[must_use]
    pub fn parser(self) -> ResponseParser {
        match self {
            Protocol::Cas10 => ResponseParser::Cas10,
            Protocol::Cas20 | Protocol::Cas30 => ResponseParser::Xml,
        }
    }

    /// Whether the protocol knows about `pgtUrl` and proxy tickets.
    #[must_use]
    pub fn supports_proxying(self) -> bool {
        !matches!(self, Protocol::Cas10)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Cas10 => "cas10",
            Protocol::Cas20 => "cas20",
            Protocol::Cas30 => "cas30",
        };
        f.write_str(name)
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cas10" | "cas1" | "1.0" => Ok(Protocol::Cas10),
            "cas20" | "cas2" | "2.0" => Ok(Protocol::Cas20),
            "cas30" | "cas3" | "3.0" => Ok(Protocol::Cas30),
            other => Err(format!(
                "unknown CAS protocol '{other}', expected cas10, cas20 or cas30"
            )),
        }
    }
}
