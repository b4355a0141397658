//! End-to-end validation against a mock CAS server over real HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use cas_client::error::{INVALID_PROXY_CHAIN, INVALID_RESPONSE, TRANSPORT_FAILURE};
use cas_client::secret::{ExposeSecret, SecretString};
use cas_client::{
    Cas20ProxyRetriever, CasClientConfig, FetchError, HttpFetcher, InMemoryPgtStorage,
    ProxyGrantingTicketStorage, Protocol, ProxyError, ProxyPolicy, TicketValidator,
};
use cas_test_utils::{
    cas10_failure, cas10_success, init_test_tracing, proxy_failure, proxy_success, CasResponse,
    MockFetcher, TestCasServer, TEST_SERVER_PREFIX,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const SERVICE: &str = "https://app.example.org/login";

fn fetcher() -> Arc<HttpFetcher> {
    Arc::new(HttpFetcher::with_timeout(Duration::from_secs(5)).unwrap())
}

// =========================================================================
// Service ticket validation (CAS 2.0)
// =========================================================================

#[tokio::test]
async fn test_invalid_ticket_is_rejected() -> Result<()> {
    init_test_tracing();
    let server = TestCasServer::start().await;
    server
        .expect_validation(
            "serviceValidate",
            "ST-1856339",
            &CasResponse::failure(
                "INVALID_TICKET",
                "Ticket ST-1856339-aA5Yuvrxzpv8Tau1cYQ7 not recognized",
            )
            .to_xml(),
        )
        .await;

    let validator = TicketValidator::new(&server.prefix(), Protocol::Cas20, fetcher())?;
    let err = validator.validate("ST-1856339", SERVICE).await.unwrap_err();

    assert_eq!(err.code, "INVALID_TICKET");
    assert_eq!(
        err.message,
        "Ticket ST-1856339-aA5Yuvrxzpv8Tau1cYQ7 not recognized"
    );
    Ok(())
}

#[tokio::test]
async fn test_success_with_attributes() -> Result<()> {
    let server = TestCasServer::start().await;
    server
        .expect_validation(
            "serviceValidate",
            "ST-2",
            &CasResponse::success("username")
                .attribute("password", "test")
                .attribute("eduPersonId", "id")
                .attribute("memberOf", "staff")
                .attribute("memberOf", "faculty")
                .to_xml(),
        )
        .await;

    let validator = TicketValidator::new(&server.prefix(), Protocol::Cas20, fetcher())?;
    let assertion = validator.validate("ST-2", SERVICE).await?;

    let principal = assertion.principal();
    assert_eq!(principal.name(), "username");
    assert_eq!(principal.attribute("password").unwrap().first(), Some("test"));
    assert_eq!(principal.attribute("eduPersonId").unwrap().first(), Some("id"));
    assert_eq!(
        principal.attribute("memberOf").unwrap().values(),
        vec!["staff", "faculty"]
    );
    assert!(assertion.proxy_granting_ticket().is_none());
    Ok(())
}

#[tokio::test]
async fn test_request_carries_service_renew_and_callback() -> Result<()> {
    let server = TestCasServer::start().await;
    server
        .expect_validation(
            "serviceValidate",
            "ST-3",
            &CasResponse::success("username").to_xml(),
        )
        .await;

    let validator = TicketValidator::new(&server.prefix(), Protocol::Cas20, fetcher())?
        .with_renew(true)
        .with_proxy_callback_url("https://app.example.org/pgtCallback".to_string());

    validator.validate("ST-3", SERVICE).await?;
    validator.validate("ST-3", SERVICE).await?;

    let queries = server.received_queries().await;
    assert_eq!(queries.len(), 2);
    for query in queries {
        assert!(query.contains(&("service".to_string(), SERVICE.to_string())));
        assert!(query.contains(&("renew".to_string(), "true".to_string())));
        assert!(query.contains(&(
            "pgtUrl".to_string(),
            "https://app.example.org/pgtCallback".to_string()
        )));
    }
    Ok(())
}

#[tokio::test]
async fn test_pgt_resolved_from_storage() -> Result<()> {
    let server = TestCasServer::start().await;
    server
        .expect_validation(
            "serviceValidate",
            "ST-4",
            &CasResponse::success("username")
                .pgt_iou("testPgtIou")
                .to_xml(),
        )
        .await;

    let storage = Arc::new(InMemoryPgtStorage::new(Duration::from_secs(60)));
    // The callback typically lands before the validation response is read
    storage
        .save("testPgtIou", SecretString::from("PGT-abc"))
        .await?;

    let validator = TicketValidator::new(&server.prefix(), Protocol::Cas20, fetcher())?
        .with_proxy_callback_url("https://app.example.org/pgtCallback".to_string())
        .with_pgt_storage(storage);

    let assertion = validator.validate("ST-4", SERVICE).await?;

    assert_eq!(
        assertion.proxy_granting_ticket().unwrap().expose_secret(),
        "PGT-abc"
    );
    Ok(())
}

#[tokio::test]
async fn test_unrecognized_document_is_invalid_response() -> Result<()> {
    let server = TestCasServer::start().await;
    server
        .expect_validation("serviceValidate", "ST-5", "<root />")
        .await;

    let validator = TicketValidator::new(&server.prefix(), Protocol::Cas20, fetcher())?;
    let err = validator.validate("ST-5", SERVICE).await.unwrap_err();

    assert_eq!(err.code, INVALID_RESPONSE);
    Ok(())
}

#[tokio::test]
async fn test_http_error_is_transport_failure() -> Result<()> {
    let server = TestCasServer::start().await;
    server.fail_validation("serviceValidate", 500).await;

    let validator = TicketValidator::new(&server.prefix(), Protocol::Cas20, fetcher())?;
    let err = validator.validate("ST-6", SERVICE).await.unwrap_err();

    assert_eq!(err.code, TRANSPORT_FAILURE);
    // No retries
    assert_eq!(server.received_queries().await.len(), 1);
    Ok(())
}

// =========================================================================
// Protocol variants
// =========================================================================

#[tokio::test]
async fn test_cas10_round_trip() -> Result<()> {
    let server = TestCasServer::start().await;
    server
        .expect_validation("validate", "ST-good", &cas10_success("alice"))
        .await;
    server
        .expect_validation("validate", "ST-bad", &cas10_failure())
        .await;

    let validator = TicketValidator::new(&server.prefix(), Protocol::Cas10, fetcher())?;

    let assertion = validator.validate("ST-good", SERVICE).await?;
    assert_eq!(assertion.principal().name(), "alice");
    assert!(assertion.principal().attributes().is_empty());

    let err = validator.validate("ST-bad", SERVICE).await.unwrap_err();
    assert_eq!(err.code, "INVALID_TICKET");
    Ok(())
}

#[tokio::test]
async fn test_cas30_endpoint() -> Result<()> {
    let server = TestCasServer::start().await;
    server
        .expect_validation(
            "p3/serviceValidate",
            "ST-7",
            &CasResponse::success("bob").attribute("mail", "bob@example.org").to_xml(),
        )
        .await;

    let validator = TicketValidator::new(&server.prefix(), Protocol::Cas30, fetcher())?;
    let assertion = validator.validate("ST-7", SERVICE).await?;

    assert_eq!(
        assertion.principal().attribute("mail").unwrap().first(),
        Some("bob@example.org")
    );
    Ok(())
}

// =========================================================================
// Proxy tickets
// =========================================================================

#[tokio::test]
async fn test_proxy_ticket_with_allowed_chain() -> Result<()> {
    let server = TestCasServer::start().await;
    server
        .expect_validation(
            "proxyValidate",
            "PT-1",
            &CasResponse::success("carol")
                .proxies(&["https://proxy2/cb", "https://proxy1/cb"])
                .to_xml(),
        )
        .await;

    let validator = TicketValidator::new(&server.prefix(), Protocol::Cas20, fetcher())?
        .accepting_proxy_tickets(ProxyPolicy::allowed_chains(ProxyPolicy::parse_chains(
            "https://proxy2/cb https://proxy1/cb",
        )));

    let assertion = validator.validate("PT-1", SERVICE).await?;
    assert_eq!(
        assertion.proxies(),
        &["https://proxy2/cb".to_string(), "https://proxy1/cb".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_proxy_ticket_with_unknown_chain_rejected() -> Result<()> {
    let server = TestCasServer::start().await;
    server
        .expect_validation(
            "proxyValidate",
            "PT-2",
            &CasResponse::success("carol")
                .proxies(&["https://evil/cb"])
                .to_xml(),
        )
        .await;

    let validator = TicketValidator::new(&server.prefix(), Protocol::Cas20, fetcher())?
        .accepting_proxy_tickets(ProxyPolicy::default());

    let err = validator.validate("PT-2", SERVICE).await.unwrap_err();
    assert_eq!(err.code, INVALID_PROXY_CHAIN);
    Ok(())
}

#[tokio::test]
async fn test_obtain_proxy_ticket_with_resolved_pgt() -> Result<()> {
    let server = TestCasServer::start().await;
    server
        .expect_validation(
            "serviceValidate",
            "ST-8",
            &CasResponse::success("dave").pgt_iou("PGTIOU-8").to_xml(),
        )
        .await;
    server
        .expect_proxy(
            "PGT-8",
            "https://backend.example.org/",
            &proxy_success("PT-8-backend"),
        )
        .await;
    server
        .expect_proxy(
            "PGT-8",
            "https://forbidden.example.org/",
            &proxy_failure("INVALID_REQUEST", "service not allowed"),
        )
        .await;

    let storage = Arc::new(InMemoryPgtStorage::default());
    storage.save("PGTIOU-8", SecretString::from("PGT-8")).await?;

    let validator = TicketValidator::new(&server.prefix(), Protocol::Cas20, fetcher())?
        .with_proxy_callback_url("https://app.example.org/pgtCallback".to_string())
        .with_pgt_storage(storage);
    let retriever = Cas20ProxyRetriever::new(&server.prefix(), fetcher())?;

    let assertion = validator.validate("ST-8", SERVICE).await?;

    let ticket = assertion
        .proxy_ticket_for("https://backend.example.org/", &retriever)
        .await?;
    assert_eq!(ticket.as_deref(), Some("PT-8-backend"));

    let err = assertion
        .proxy_ticket_for("https://forbidden.example.org/", &retriever)
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::Rejected { code, .. } if code == "INVALID_REQUEST"));
    Ok(())
}

// =========================================================================
// Configuration
// =========================================================================

#[tokio::test]
async fn test_validator_from_config() -> Result<()> {
    let server = TestCasServer::start().await;
    server
        .expect_validation(
            "p3/proxyValidate",
            "PT-9",
            &CasResponse::success("erin")
                .proxies(&["https://any/cb"])
                .to_xml(),
        )
        .await;

    let vars = HashMap::from([
        ("CAS_SERVER_URL_PREFIX".to_string(), server.prefix()),
        ("CAS_PROTOCOL".to_string(), "cas30".to_string()),
        ("CAS_RENEW".to_string(), "true".to_string()),
        ("CAS_ACCEPT_PROXY_TICKETS".to_string(), "true".to_string()),
        ("CAS_ACCEPT_ANY_PROXY".to_string(), "true".to_string()),
    ]);
    let config = CasClientConfig::from_vars(&vars)?;

    let storage: Arc<dyn ProxyGrantingTicketStorage> =
        Arc::new(InMemoryPgtStorage::new(config.pgt_ttl()));
    let validator = TicketValidator::from_config(
        &config,
        Arc::new(HttpFetcher::with_timeout(config.http_timeout())?),
        Some(storage),
    )?;

    let assertion = validator.validate("PT-9", SERVICE).await?;
    assert_eq!(assertion.principal().name(), "erin");

    let queries = server.received_queries().await;
    assert!(queries[0].contains(&("renew".to_string(), "true".to_string())));
    Ok(())
}

// =========================================================================
// Scripted fetcher
// =========================================================================

#[tokio::test]
async fn test_caller_retries_after_transport_failure() -> Result<()> {
    let fetcher = MockFetcher::sequence(vec![
        Err(FetchError::Status(503)),
        Ok(CasResponse::success("frank").to_xml()),
    ]);
    let validator = TicketValidator::new(TEST_SERVER_PREFIX, Protocol::Cas20, fetcher.clone())?;

    let err = validator.validate("ST-10", SERVICE).await.unwrap_err();
    assert_eq!(err.code, TRANSPORT_FAILURE);
    assert_eq!(fetcher.call_count(), 1);

    let assertion = validator.validate("ST-10", SERVICE).await?;
    assert_eq!(assertion.principal().name(), "frank");

    let urls = fetcher.requested_urls();
    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0], urls[1]);
    Ok(())
}

#[tokio::test]
async fn test_connection_error_is_transport_failure() -> Result<()> {
    let fetcher = MockFetcher::failing(FetchError::Transport("connection reset".to_string()));
    let validator = TicketValidator::new(TEST_SERVER_PREFIX, Protocol::Cas30, fetcher.clone())?;

    let err = validator.validate("ST-11", SERVICE).await.unwrap_err();

    assert_eq!(err.code, TRANSPORT_FAILURE);
    assert_eq!(fetcher.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_custom_parameters_do_not_shadow_protocol_parameters() -> Result<()> {
    let fetcher = MockFetcher::responding(CasResponse::success("grace").to_xml());
    let validator = TicketValidator::new(TEST_SERVER_PREFIX, Protocol::Cas20, fetcher.clone())?
        .with_renew(true)
        .with_custom_parameter("renew".to_string(), "false".to_string())
        .with_custom_parameter("ticket".to_string(), "ST-other".to_string())
        .with_custom_parameter("locale".to_string(), "en".to_string());

    validator.validate("ST-12", "svc").await?;

    assert_eq!(
        fetcher.last_url().unwrap(),
        format!("{TEST_SERVER_PREFIX}/serviceValidate?ticket=ST-12&service=svc&renew=true&locale=en")
    );
    Ok(())
}

#[tokio::test]
async fn test_custom_parameter_reaches_server() -> Result<()> {
    let server = TestCasServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/serviceValidate"))
        .and(query_param("locale", "fr"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(CasResponse::success("heidi").to_xml()),
        )
        .expect(1)
        .mount(server.mock_server())
        .await;

    let validator = TicketValidator::new(&server.prefix(), Protocol::Cas20, fetcher())?
        .with_custom_parameter("locale".to_string(), "fr".to_string());

    let assertion = validator.validate("ST-13", SERVICE).await?;
    assert_eq!(assertion.principal().name(), "heidi");
    Ok(())
}
