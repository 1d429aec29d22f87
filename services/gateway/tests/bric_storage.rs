//! BRIC storage sub-protocol scenarios.

use epx_gateway::{
    Environment, Gateway, GatewayConfig, GatewayError, MerchantIdentity, RetryPolicy, TranType,
    TransactionRequest,
};
use mockito::{Matcher, Server};
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

fn gateway_for(server: &Server) -> Gateway {
    let mut config = GatewayConfig::sandbox();
    config.server_post_url = server.url();
    config.retry = RetryPolicy {
        max_retries: 0,
        ..RetryPolicy::default()
    };
    Gateway::new(config, identity()).unwrap()
}

#[tokio::test]
async fn storage_from_prior_guid_sends_detail_xml() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_header("content-type", "application/xml")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"<DETAIL cust_nbr="9001""#.to_string()),
            Matcher::Regex("<TRAN_TYPE>CCE8</TRAN_TYPE>".to_string()),
            Matcher::Regex("<ORIG_AUTH_GUID>G-PRIOR</ORIG_AUTH_GUID>".to_string()),
            Matcher::Regex("<CARD_ENT_METH>Z</CARD_ENT_METH>".to_string()),
        ]))
        .with_status(200)
        .with_body("AUTH_GUID=BRIC-NEW&AUTH_RESP=85")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let response = gateway
        .store_bric_from_transaction(
            &CancellationToken::new(),
            TransactionRequest {
                tran_nbr: "900".into(),
                original_auth_guid: Some("G-PRIOR".into()),
                first_name: Some("Jane".into()),
                last_name: Some("Doe".into()),
                zip_code: Some("30303".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    mock.assert_async().await;
    // Storage treats 85 as approved.
    assert!(response.is_approved);
    assert_eq!(response.auth_guid, "BRIC-NEW");
}

#[tokio::test]
async fn storage_from_raw_card_uses_entry_method_e() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("<TRAN_TYPE>CCE8</TRAN_TYPE>".to_string()),
            Matcher::Regex("<ACCOUNT_NBR>4111111111111111</ACCOUNT_NBR>".to_string()),
            Matcher::Regex("<CARD_ENT_METH>E</CARD_ENT_METH>".to_string()),
        ]))
        .with_status(200)
        .with_body("AUTH_GUID=BRIC-CARD&AUTH_RESP=00")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let response = gateway
        .store_bric_from_account(
            &CancellationToken::new(),
            TransactionRequest {
                tran_nbr: "901".into(),
                account_nbr: Some("4111111111111111".into()),
                exp_date: Some("1225".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    mock.assert_async().await;
    assert!(response.is_approved);
}

#[tokio::test]
async fn ach_storage_from_raw_account_uses_entry_method_x() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("<TRAN_TYPE>CKC8</TRAN_TYPE>".to_string()),
            Matcher::Regex("<ROUTING_NBR>021000021</ROUTING_NBR>".to_string()),
            Matcher::Regex("<CARD_ENT_METH>X</CARD_ENT_METH>".to_string()),
        ]))
        .with_status(200)
        .with_body("AUTH_GUID=BRIC-ACH&AUTH_RESP=85")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let response = gateway
        .store_bric_from_account(
            &CancellationToken::new(),
            TransactionRequest {
                tran_type: Some(TranType::AchBricStorage),
                tran_nbr: "902".into(),
                account_nbr: Some("123456789".into()),
                routing_nbr: Some("021000021".into()),
                first_name: Some("Jane".into()),
                last_name: Some("Doe".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    mock.assert_async().await;
    assert!(response.is_approved);
}

#[tokio::test]
async fn update_keeps_the_original_guid_canonical() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body("AUTH_GUID=BRIC-ECHOED-NEW&AUTH_RESP=00")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let response = gateway
        .update_bric(
            &CancellationToken::new(),
            TransactionRequest {
                tran_nbr: "903".into(),
                original_auth_guid: Some("BRIC-ORIGINAL".into()),
                zip_code: Some("30303".into()),
                exp_date: Some("0130".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    // The processor echoed a new GUID; the caller must keep using the
    // original token.
    assert_eq!(response.auth_guid, "BRIC-ORIGINAL");
    assert_eq!(response.new_auth_guid.as_deref(), Some("BRIC-ECHOED-NEW"));
    assert!(response.raw_body.contains("BRIC-ECHOED-NEW"));
}

#[tokio::test]
async fn update_with_same_guid_sets_no_new_guid() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body("AUTH_GUID=BRIC-ORIGINAL&AUTH_RESP=00")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let response = gateway
        .update_bric(
            &CancellationToken::new(),
            TransactionRequest {
                tran_nbr: "904".into(),
                original_auth_guid: Some("BRIC-ORIGINAL".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(response.auth_guid, "BRIC-ORIGINAL");
    assert!(response.new_auth_guid.is_none());
}

#[tokio::test]
async fn storage_without_source_material_is_rejected_locally() {
    let mut server = Server::new_async().await;
    let mock = server.mock("POST", "/").expect(0).create_async().await;

    let gateway = gateway_for(&server);
    let from_tx = gateway
        .store_bric_from_transaction(&CancellationToken::new(), TransactionRequest {
            tran_nbr: "905".into(),
            ..Default::default()
        })
        .await;
    assert!(matches!(from_tx, Err(GatewayError::Validation { .. })));

    let from_account = gateway
        .store_bric_from_account(&CancellationToken::new(), TransactionRequest {
            tran_nbr: "906".into(),
            ..Default::default()
        })
        .await;
    assert!(matches!(from_account, Err(GatewayError::Validation { .. })));
    mock.assert_async().await;
}

#[tokio::test]
async fn storage_decline_code_is_not_approved() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body("AUTH_GUID=BRIC-X&AUTH_RESP=05")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let response = gateway
        .store_bric_from_transaction(
            &CancellationToken::new(),
            TransactionRequest {
                tran_nbr: "907".into(),
                original_auth_guid: Some("G-PRIOR".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!response.is_approved);
}
