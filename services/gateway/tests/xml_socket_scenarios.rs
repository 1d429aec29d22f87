//! XML-over-TCP Server Post scenarios against an in-process listener.

use std::time::Duration;

use epx_gateway::{
    ChannelKind, Environment, Gateway, GatewayConfig, GatewayError, MerchantIdentity, RetryPolicy,
    TransactionRequest, XmlSocketChannel,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const RESPONSE_XML: &str = r#"<RESPONSE><FIELDS>
    <FIELD KEY="AUTH_GUID">09SOCKET1</FIELD>
    <FIELD KEY="AUTH_RESP">00</FIELD>
    <FIELD KEY="AUTH_CODE">654321</FIELD>
</FIELDS></RESPONSE>"#;

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

/// Accept one connection, read until the request document's closing tag,
/// reply, then close the socket. Returns the captured request bytes.
async fn one_shot_server(
    listener: TcpListener,
    closing_tag: &'static str,
    reply: Option<&'static str>,
) -> tokio::task::JoinHandle<String> {
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if request
                .windows(closing_tag.len())
                .any(|w| w == closing_tag.as_bytes())
            {
                break;
            }
        }
        if let Some(reply) = reply {
            stream.write_all(reply.as_bytes()).await.unwrap();
            stream.flush().await.unwrap();
        }
        // Dropping the stream closes the connection, which is the reply
        // delimiter on this channel.
        String::from_utf8(request).unwrap()
    })
}

#[tokio::test]
async fn exchange_round_trips_a_document() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = one_shot_server(listener, "</CCE1>", Some(RESPONSE_XML)).await;

    let channel = XmlSocketChannel::new(addr.to_string(), Duration::from_secs(5), identity());
    let raw = channel
        .exchange(
            &CancellationToken::new(),
            r#"<CCE1 cust_nbr="9001" merch_nbr="900300" dba_nbr="2" terminal_nbr="21"><TRAN_TYPE>CCE1</TRAN_TYPE></CCE1>"#,
        )
        .await
        .unwrap();

    assert_eq!(raw.get("AUTH_GUID"), Some("09SOCKET1"));
    assert_eq!(raw.get("AUTH_RESP"), Some("00"));

    let seen = server.await.unwrap();
    assert!(seen.contains("<TRAN_TYPE>CCE1</TRAN_TYPE>"));
}

#[tokio::test]
async fn sale_rides_the_socket_when_configured() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = one_shot_server(listener, "</CCE1>", Some(RESPONSE_XML)).await;

    let mut config = GatewayConfig::sandbox();
    config.xml_socket_addr = addr.to_string();
    config.financial_channel = ChannelKind::XmlSocket;
    config.retry = RetryPolicy {
        max_retries: 0,
        ..RetryPolicy::default()
    };
    let gateway = Gateway::new(config, identity()).unwrap();

    let response = gateway
        .sale(
            &CancellationToken::new(),
            TransactionRequest {
                amount: "10.00".into(),
                tran_nbr: "321".into(),
                account_nbr: Some("4111111111111111".into()),
                exp_date: Some("1225".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(response.is_approved);
    assert_eq!(response.auth_guid, "09SOCKET1");

    let seen = server.await.unwrap();
    // The request root names the transaction; DETAIL is the BRIC body only.
    assert!(seen.starts_with("<CCE1 cust_nbr=\"9001\""));
    assert!(seen.ends_with("</CCE1>"));
    assert!(!seen.contains("DETAIL"));
    assert!(seen.contains("<TRAN_TYPE>CCE1</TRAN_TYPE>"));
    assert!(seen.contains("<ACCOUNT_NBR>4111111111111111</ACCOUNT_NBR>"));
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and hold the connection open without replying.
    let _server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(stream);
    });

    let channel = XmlSocketChannel::new(addr.to_string(), Duration::from_millis(200), identity());
    let result = channel
        .exchange(&CancellationToken::new(), "<CCE1></CCE1>")
        .await;
    assert!(matches!(result, Err(GatewayError::Timeout { .. })));
}

#[tokio::test]
async fn connection_refused_is_a_network_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let channel = XmlSocketChannel::new(addr.to_string(), Duration::from_secs(1), identity());
    let result = channel
        .exchange(&CancellationToken::new(), "<CCE1></CCE1>")
        .await;
    assert!(matches!(result, Err(GatewayError::Network { .. })));
}

#[tokio::test]
async fn cancellation_aborts_the_exchange() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(stream);
    });

    let cancel = CancellationToken::new();
    let channel = XmlSocketChannel::new(addr.to_string(), Duration::from_secs(10), identity());

    let token = cancel.clone();
    let handle = tokio::spawn(async move {
        channel
            .exchange(&token, "<CCE1></CCE1>")
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(GatewayError::Cancelled)));
}

#[tokio::test]
async fn reply_larger_than_initial_buffer_is_read_completely() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Build a >8 KiB response to force buffer growth.
    let padding = "X".repeat(9000);
    let big_reply: &'static str = Box::leak(
        format!(
            r#"<RESPONSE><FIELDS><FIELD KEY="AUTH_GUID">BIG</FIELD><FIELD KEY="AUTH_RESP">00</FIELD><FIELD KEY="AUTH_RESP_TEXT">{padding}</FIELD></FIELDS></RESPONSE>"#
        )
        .into_boxed_str(),
    );
    let _server = one_shot_server(listener, "</CCE1>", Some(big_reply)).await;

    let channel = XmlSocketChannel::new(addr.to_string(), Duration::from_secs(5), identity());
    let raw = channel
        .exchange(
            &CancellationToken::new(),
            r#"<CCE1 cust_nbr="1" merch_nbr="2" dba_nbr="3" terminal_nbr="4"><TRAN_TYPE>CCE1</TRAN_TYPE></CCE1>"#,
        )
        .await
        .unwrap();
    assert_eq!(raw.get("AUTH_GUID"), Some("BIG"));
    assert_eq!(raw.get("AUTH_RESP_TEXT").map(str::len), Some(9000));
}
