//! Mock CAS server for HTTP-level tests.
//!
//! Provides `TestCasServer`, a `wiremock` server mounted under a `/cas`
//! context path that answers validation and proxy requests.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Context path the mock server's endpoints live under.
pub const TEST_CONTEXT_PATH: &str = "/cas";

/// Prefix used by tests that never touch the network.
pub const TEST_SERVER_PREFIX: &str = "https://cas.example.org/cas";

/// Mock CAS server.
///
/// # Example
/// ```rust,ignore
/// let server = TestCasServer::start().await;
/// server
///     .expect_validation("serviceValidate", "ST-1", &CasResponse::success("alice").to_xml())
///     .await;
///
/// let validator = TicketValidator::new(&server.prefix(), Protocol::Cas20, fetcher)?;
/// ```
pub struct TestCasServer {
    server: MockServer,
}

impl TestCasServer {
    /// Start a server on a random local port.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// CAS server URL prefix to configure clients with.
    pub fn prefix(&self) -> String {
        format!("{}{TEST_CONTEXT_PATH}", self.server.uri())
    }

    /// Answer `GET /cas/{endpoint}?ticket={ticket}` with `body`.
    pub async fn expect_validation(&self, endpoint: &str, ticket: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("{TEST_CONTEXT_PATH}/{endpoint}")))
            .and(query_param("ticket", ticket))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .insert_header("content-type", "application/xml;charset=UTF-8"),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer `GET /cas/{endpoint}` with an HTTP error status.
    pub async fn fail_validation(&self, endpoint: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("{TEST_CONTEXT_PATH}/{endpoint}")))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Answer `GET /cas/proxy?pgt={pgt}&targetService={target}` with `body`.
    pub async fn expect_proxy(&self, pgt: &str, target_service: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("{TEST_CONTEXT_PATH}/proxy")))
            .and(query_param("pgt", pgt))
            .and(query_param("targetService", target_service))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Query strings of every request received, in order.
    pub async fn received_queries(&self) -> Vec<Vec<(String, String)>> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| {
                request
                    .url
                    .query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .collect()
    }

    /// The underlying `wiremock` server, for custom mocks.
    pub fn mock_server(&self) -> &MockServer {
        &self.server
    }
}
