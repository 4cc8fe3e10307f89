use cookiesync_engine::{SyncError, SyncRequestor};
use cookiesync_types::{
    ArgValue, ConsentData, EndpointArgs, SyncConfig, SyncStatus, MAX_SAFE_INTEGER,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> SyncConfig {
    SyncConfig {
        endpoint_url: format!("{}/cookie_sync", server.uri()),
        ..Default::default()
    }
}

fn ok_response() -> serde_json::Value {
    json!({
        "status": "ok",
        "bidder_status": [
            {"bidder": "a", "no_cookie": true, "usersync": {"type": "image", "url": "https://x.test/sync"}},
            {"bidder": "b", "no_cookie": false, "usersync": {"type": "iframe", "url": "https://y.test/sync"}}
        ]
    })
}

/// A loopback port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// ── Payload ─────────────────────────────────────────────────────

#[test]
fn body_includes_args_limit_and_consent() {
    let mut args = EndpointArgs::new();
    args.insert("account".into(), ArgValue::Int(42));
    let config = SyncConfig {
        endpoint_args: Some(args),
        max_sync_count: 5,
        ..Default::default()
    };
    let consent = ConsentData::new(true, "CO-abc");

    let body = SyncRequestor::build_body(&config, Some(&consent));
    assert_eq!(
        body.to_json(),
        json!({"account": 42, "limit": 5, "gdpr": 1, "gdpr_consent": "CO-abc"})
    );
}

#[tokio::test]
async fn posts_json_with_consent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cookie_sync"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"limit": 10, "gdpr": 1, "gdpr_consent": "CO-abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_response()))
        .expect(1)
        .mount(&server)
        .await;

    let config = SyncConfig {
        max_sync_count: 10,
        ..config_for(&server)
    };
    let requestor = SyncRequestor::new().unwrap();
    let bidders = requestor
        .request(&config, Some(&ConsentData::new(true, "CO-abc")))
        .await
        .unwrap();

    assert_eq!(bidders.len(), 2);
    assert_eq!(bidders[0].bidder, "a");
}

#[tokio::test]
async fn unknown_consent_omits_gdpr_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cookie_sync"))
        .and(body_json(json!({"limit": MAX_SAFE_INTEGER})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_response()))
        .expect(1)
        .mount(&server)
        .await;

    let requestor = SyncRequestor::new().unwrap();
    let bidders = requestor.request(&config_for(&server), None).await;
    assert!(bidders.is_some());
}

// ── Response handling ───────────────────────────────────────────

#[tokio::test]
async fn no_cookie_status_with_list_is_dispatched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "no_cookie",
            "bidder_status": [{"bidder": "c", "no_cookie": true, "usersync": {"type": "redirect", "url": "https://z.test/s"}}]
        })))
        .mount(&server)
        .await;

    let bidders = SyncRequestor::new()
        .unwrap()
        .request(&config_for(&server), None)
        .await
        .unwrap();
    assert_eq!(bidders.len(), 1);
}

#[tokio::test]
async fn error_status_is_a_no_op() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "bidder_status": [{"bidder": "c", "no_cookie": true}]
        })))
        .mount(&server)
        .await;

    let requestor = SyncRequestor::new().unwrap();
    let config = config_for(&server);

    let response = requestor.try_request(&config, None).await.unwrap();
    assert_eq!(response.status, SyncStatus::Error);
    assert!(requestor.request(&config, None).await.is_none());
}

#[tokio::test]
async fn ok_without_bidder_list_is_a_no_op() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let requestor = SyncRequestor::new().unwrap();
    assert!(requestor.request(&config_for(&server), None).await.is_none());
}

#[tokio::test]
async fn malformed_body_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let requestor = SyncRequestor::new().unwrap();
    let config = config_for(&server);

    let err = requestor.try_request(&config, None).await.unwrap_err();
    assert!(matches!(err, SyncError::Protocol(_)));
    assert!(requestor.request(&config, None).await.is_none());
}

#[tokio::test]
async fn not_modified_with_empty_body_is_a_no_op() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let requestor = SyncRequestor::new().unwrap();
    let config = config_for(&server);

    let err = requestor.try_request(&config, None).await.unwrap_err();
    assert!(matches!(err, SyncError::Protocol(_)));
    assert!(requestor.request(&config, None).await.is_none());
}

#[tokio::test]
async fn server_error_is_swallowed_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let requestor = SyncRequestor::new().unwrap();
    let config = config_for(&server);

    let err = requestor.try_request(&config, None).await.unwrap_err();
    assert!(matches!(err, SyncError::HttpStatus { status: 500, .. }));
    assert!(requestor.request(&config, None).await.is_none());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    let config = SyncConfig {
        endpoint_url: format!("http://127.0.0.1:{}/cookie_sync", closed_port()),
        ..Default::default()
    };

    let requestor = SyncRequestor::new().unwrap();
    let err = requestor.try_request(&config, None).await.unwrap_err();
    assert!(matches!(err, SyncError::Network(_)));
    assert!(requestor.request(&config, None).await.is_none());
}

#[tokio::test]
async fn invalid_endpoint_url_is_swallowed() {
    let config = SyncConfig {
        endpoint_url: "not a url".into(),
        ..Default::default()
    };
    let requestor = SyncRequestor::new().unwrap();
    assert!(requestor.request(&config, None).await.is_none());
}
