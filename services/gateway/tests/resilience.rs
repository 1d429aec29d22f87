//! Breaker-and-retry behavior through the full pipeline.

use std::time::Duration;

use epx_gateway::{
    CircuitBreakerConfig, CircuitState, Environment, Gateway, GatewayConfig, GatewayError,
    MerchantIdentity, RetryPolicy, TransactionRequest,
};
use mockito::Server;
use tokio_util::sync::CancellationToken;

fn identity() -> MerchantIdentity {
    MerchantIdentity {
        cust_nbr: "9001".into(),
        merch_nbr: "900300".into(),
        dba_nbr: "2".into(),
        terminal_nbr: "21".into(),
        environment: Environment::Test,
        epi_id: "9001-900300-2-21".into(),
        mac_key: "test-mac-key".into(),
    }
}

fn card_sale(tran_nbr: &str) -> TransactionRequest {
    TransactionRequest {
        amount: "10.00".into(),
        tran_nbr: tran_nbr.into(),
        account_nbr: Some("4111111111111111".into()),
        exp_date: Some("1225".into()),
        ..Default::default()
    }
}

fn resilient_config(server: &Server) -> GatewayConfig {
    let mut config = GatewayConfig::sandbox();
    config.server_post_url = server.url();
    config.breaker = CircuitBreakerConfig {
        max_failures: 3,
        timeout: Duration::from_millis(100),
        max_requests_half_open: 1,
    };
    config.retry = RetryPolicy {
        max_retries: 0,
        ..RetryPolicy::default()
    };
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn circuit_opens_after_three_failures_and_recovers() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", "/")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let gateway = Gateway::new(resilient_config(&server), identity()).unwrap();
    let cancel = CancellationToken::new();

    for i in 0..3 {
        let result = gateway.sale(&cancel, card_sale(&format!("{i}"))).await;
        assert!(
            matches!(result, Err(GatewayError::GatewayStatus { .. })),
            "call {i}"
        );
    }
    assert_eq!(gateway.breaker_metrics().state, CircuitState::Open);

    // Fourth call fails fast without touching the wire.
    let fourth = gateway.sale(&cancel, card_sale("3")).await;
    assert!(matches!(fourth, Err(GatewayError::CircuitOpen)));
    failing.assert_async().await;

    // After the breaker timeout, a successful probe closes the circuit.
    server.reset();
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body("AUTH_GUID=G-RECOVERED&AUTH_RESP=00")
        .create_async()
        .await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    let recovered = gateway.sale(&cancel, card_sale("4")).await.unwrap();
    assert!(recovered.is_approved);
    assert_eq!(gateway.breaker_metrics().state, CircuitState::Closed);
}

#[tokio::test]
async fn declines_do_not_trip_the_breaker() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body("AUTH_GUID=GD&AUTH_RESP=05")
        .expect(5)
        .create_async()
        .await;

    let gateway = Gateway::new(resilient_config(&server), identity()).unwrap();
    let cancel = CancellationToken::new();

    for i in 0..5 {
        let response = gateway.sale(&cancel, card_sale(&format!("{i}"))).await.unwrap();
        assert!(!response.is_approved);
    }
    assert_eq!(gateway.breaker_metrics().state, CircuitState::Closed);
    assert_eq!(gateway.breaker_metrics().consecutive_failures, 0);
}

#[tokio::test]
async fn validation_failures_do_not_count_toward_the_breaker() {
    let mut server = Server::new_async().await;
    let mock = server.mock("POST", "/").expect(0).create_async().await;

    let gateway = Gateway::new(resilient_config(&server), identity()).unwrap();
    let cancel = CancellationToken::new();

    for _ in 0..5 {
        let result = gateway
            .sale(
                &cancel,
                TransactionRequest {
                    amount: "".into(),
                    tran_nbr: "1".into(),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(GatewayError::Validation { .. })));
    }
    assert_eq!(gateway.breaker_metrics().state, CircuitState::Closed);
    mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn reset_reopens_the_path_immediately() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let gateway = Gateway::new(resilient_config(&server), identity()).unwrap();
    let cancel = CancellationToken::new();
    for i in 0..3 {
        let _ = gateway.sale(&cancel, card_sale(&format!("{i}"))).await;
    }
    assert_eq!(gateway.breaker_metrics().state, CircuitState::Open);

    gateway.reset_breaker();
    assert_eq!(gateway.breaker_metrics().state, CircuitState::Closed);

    server.reset();
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body("AUTH_GUID=G&AUTH_RESP=00")
        .create_async()
        .await;
    assert!(gateway.sale(&cancel, card_sale("9")).await.is_ok());
}

#[tokio::test]
async fn retries_inside_one_call_count_as_one_breaker_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let mut config = resilient_config(&server);
    // One call, three attempts. The breaker sees a single failed call.
    config.retry = RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        jitter_ratio: 0.0,
        ..RetryPolicy::default()
    };
    let gateway = Gateway::new(config, identity()).unwrap();

    let result = gateway
        .sale(&CancellationToken::new(), card_sale("1"))
        .await;
    assert!(result.is_err());
    let metrics = gateway.breaker_metrics();
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(metrics.consecutive_failures, 1);
}
