// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the live provider clients
//!
//! These tests use wiremock to simulate upstream behavior: success bodies,
//! non-2xx statuses, malformed JSON, slow answers and auth headers.

use std::{sync::Arc, time::Duration};

use api_client::{Endpoint, HealthStatus, ProviderClient, ProviderError};
use external_apis::{
    DEFAULT_PRICE_KEY_HEADER, IndexerClient, IndexerConfig, MempoolClient, PriceClient,
    ProviderRegistry, SourceConfig, combine_health,
};
use shared_types::WalletAddress;
use tokio_test::assert_ok;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

use fixtures::*;

fn indexer_config(server: &MockServer) -> IndexerConfig {
    IndexerConfig {
        source: keyed_source_config(server, "x-api-key"),
        page_size: 10,
    }
}

/// Test successful fee retrieval
#[tokio::test]
async fn mempool_fetch_returns_raw_json() {
    let mock_server = MockServer::start().await;
    MempoolFixture::mount(&mock_server).await;
    let client = MempoolClient::new(source_config(&mock_server)).unwrap();

    let response = assert_ok!(client.fetch(&Endpoint::RecommendedFees).await);

    assert_eq!(response.status, 200);
    assert_eq!(response.body, MempoolFixture::recommended_fees());
}

/// Test that non-2xx statuses become typed failures
#[tokio::test]
async fn mempool_server_error_is_typed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mempool"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;
    let client = MempoolClient::new(source_config(&mock_server)).unwrap();

    let error = client.fetch(&Endpoint::MempoolStats).await.unwrap_err();

    match &error {
        ProviderError::Http { status, message } => {
            assert_eq!(*status, 500);
            assert_eq!(message, "Internal Server Error");
        }
        other => panic!("Expected Http error, got: {other:?}"),
    }
    assert!(error.is_transient());
}

/// Test that a 200 with a non-JSON body is a decode failure
#[tokio::test]
async fn malformed_body_is_decode_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/mining/hashrate/3d"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;
    let client = MempoolClient::new(source_config(&mock_server)).unwrap();

    let error = client.fetch(&Endpoint::Hashrate).await.unwrap_err();

    assert!(matches!(error, ProviderError::Decode { .. }));
    assert!(!error.is_transient());
}

/// Test that a slow upstream produces a timeout
#[tokio::test]
async fn slow_upstream_times_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/difficulty-adjustment"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;
    let config = source_config(&mock_server).with_timeout(Duration::from_millis(200));
    let client = MempoolClient::new(config).unwrap();

    let error = client.fetch(&Endpoint::DifficultyAdjustment).await.unwrap_err();

    assert_eq!(error, ProviderError::Timeout { timeout_ms: 200 });
}

/// Test that unreachable upstreams are network errors
#[tokio::test]
async fn connection_refused_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let config = SourceConfig::new(url::Url::parse(&base).unwrap(), "/health")
        .with_timeout(TEST_TIMEOUT);
    let client = MempoolClient::new(config).unwrap();

    let error = client.fetch(&Endpoint::RecentBlocks).await.unwrap_err();

    assert!(matches!(error, ProviderError::Network { .. }));
}

/// Test indexer auth header and listing query
#[tokio::test]
async fn indexer_sends_api_key_and_listing_query() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/runes"))
        .and(header("x-api-key", TEST_API_KEY))
        .and(query_param("sort", "volume_24h"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(IndexerFixture::runes()))
        .expect(1)
        .mount(&mock_server)
        .await;
    let client = IndexerClient::new(indexer_config(&mock_server)).unwrap();

    let response = assert_ok!(client.fetch(&Endpoint::Runes).await);

    assert_eq!(response.body, IndexerFixture::runes());
}

/// Test address-scoped indexer endpoint
#[tokio::test]
async fn indexer_address_inscriptions() {
    let mock_server = MockServer::start().await;
    let address = WalletAddress::parse("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq").unwrap();
    Mock::given(method("GET"))
        .and(path(format!("/v1/addresses/{address}/inscriptions")))
        .and(query_param("limit", "20"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(IndexerFixture::address_inscriptions()),
        )
        .mount(&mock_server)
        .await;
    let client = IndexerClient::new(indexer_config(&mock_server)).unwrap();

    let response = assert_ok!(client.fetch(&Endpoint::AddressInscriptions(address)).await);

    assert_eq!(response.body["total"], 1);
}

/// Test indexer authentication failure
#[tokio::test]
async fn indexer_unauthorized_is_not_transient() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/collections"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    let client = IndexerClient::new(indexer_config(&mock_server)).unwrap();

    let error = client.fetch(&Endpoint::Collections).await.unwrap_err();

    assert!(matches!(error, ProviderError::Http { status: 401, .. }));
    assert!(!error.is_transient());
}

/// Test price aggregator key header
#[tokio::test]
async fn price_client_uses_its_key_header() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/simple/price"))
        .and(query_param("ids", "bitcoin"))
        .and(header(DEFAULT_PRICE_KEY_HEADER, TEST_API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(PriceFixture::btc_price()))
        .mount(&mock_server)
        .await;
    let client =
        PriceClient::new(keyed_source_config(&mock_server, DEFAULT_PRICE_KEY_HEADER)).unwrap();

    let response = assert_ok!(client.fetch(&Endpoint::BtcPrice).await);

    assert_eq!(response.body["bitcoin"]["usd"], 67_001.5);
}

/// Test health check states
#[tokio::test]
async fn health_check_maps_probe_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;
    let client = MempoolClient::new(source_config(&mock_server)).unwrap();

    let status = client.health_check().await.unwrap();

    assert_eq!(
        status,
        HealthStatus::Degraded {
            reason: "Rate limited".to_string()
        }
    );
}

/// Test live registry routing and concurrent health checks
#[tokio::test]
async fn live_registry_routes_by_source() {
    let mempool_server = MockServer::start().await;
    let indexer_server = MockServer::start().await;
    let price_server = MockServer::start().await;
    MempoolFixture::mount(&mempool_server).await;
    Mock::given(method("GET"))
        .and(path("/v1/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(PriceFixture::btc_price()))
        .mount(&price_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&price_server)
        .await;

    let registry = Arc::new(ProviderRegistry::live(
        MempoolClient::new(source_config(&mempool_server)).unwrap(),
        IndexerClient::new(indexer_config(&indexer_server)).unwrap(),
        PriceClient::new(source_config(&price_server)).unwrap(),
    ));

    assert_ok!(registry.fetch(&Endpoint::RecentBlocks).await);
    assert_ok!(registry.fetch(&Endpoint::BtcPrice).await);
    // indexer server has no mocks mounted
    assert!(matches!(
        registry.fetch(&Endpoint::Runes).await,
        Err(ProviderError::Http { status: 404, .. })
    ));

    let health = registry.overall_health().await;
    assert_eq!(health.len(), 3);
    let indexer = health.iter().find(|h| h.provider == "indexer").unwrap();
    assert!(indexer.status.is_available());
    assert!(matches!(combine_health(&health), HealthStatus::Degraded { .. }));
}
