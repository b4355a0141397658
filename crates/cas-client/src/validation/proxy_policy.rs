//! Which proxy chains a proxy-ticket validator accepts.
//!
//! A proxy ticket's response lists every service that proxied the
//! authentication. The validator either accepts any chain or only chains
//! that exactly match (same services, same order) one of the configured
//! allowed chains. An empty chain is always acceptable: it is what a plain
//! service ticket looks like when validated at the proxy endpoint.

/// Proxy chain acceptance rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyPolicy {
    accept_any: bool,
    allowed_chains: Vec<Vec<String>>,
}

impl ProxyPolicy {
    /// Accept proxy tickets regardless of chain.
    #[must_use]
    pub fn accept_any() -> Self {
        Self {
            accept_any: true,
            allowed_chains: Vec::new(),
        }
    }

    /// Accept only the given chains.
    #[must_use]
    pub fn allowed_chains(chains: Vec<Vec<String>>) -> Self {
        Self {
            accept_any: false,
            allowed_chains: chains,
        }
    }

    /// Parse chains from their configuration form.
    ///
    /// Chains are separated by `;` or newlines; the URLs within a chain are
    /// separated by whitespace. Empty chains are skipped.
    #[must_use]
    pub fn parse_chains(raw: &str) -> Vec<Vec<String>> {
        raw.split([';', '\n'])
            .map(|chain| {
                chain
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|chain| !chain.is_empty())
            .collect()
    }

    #[must_use]
    pub fn is_accept_any(&self) -> bool {
        self.accept_any
    }

    /// Whether `chain` may be accepted.
    #[must_use]
    pub fn is_allowed(&self, chain: &[String]) -> bool {
        chain.is_empty()
            || self.accept_any
            || self
                .allowed_chains
                .iter()
                .any(|allowed| allowed.as_slice() == chain)
    }
}
