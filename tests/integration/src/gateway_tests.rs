//! End-to-end call flows against the local fake gateway.

use crate::test_utils::{init_tracing, FakeGateway, FakeTokenEndpoint, GatewayScript};
use axum::http::StatusCode;
use liftcall_api::{
    CallFlow, CallRequest, CallTarget, ClientError, FlowReport, InboundFrame, RunMode,
    TokenProvider, Transport, ValidationOutcome, ValidationPolicy, WsTransport,
};
use liftcall_core::{Config, CredentialsConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{timeout, Instant};

const CANCEL_DELAY: Duration = Duration::from_millis(200);

fn flow() -> CallFlow {
    CallFlow::new(
        ValidationPolicy::default(),
        CallTarget::new("4TFxWRCv23D", "1"),
        CANCEL_DELAY,
    )
}

fn recorder() -> (Arc<Mutex<Vec<InboundFrame>>>, impl FnMut(&InboundFrame) + Send) {
    let frames = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&frames);
    (frames, move |frame: &InboundFrame| sink.lock().unwrap().push(frame.clone()))
}

#[tokio::test]
async fn test_accepted_call_reaches_gateway() {
    init_tracing();
    let gateway = FakeGateway::start(GatewayScript::ack_and_close()).await;
    let mut transport = WsTransport::connect(&gateway.url()).await.unwrap();
    let request = CallRequest::destination_call(1000, 3000, 1);
    let (frames, handler) = recorder();

    let report = timeout(
        Duration::from_secs(5),
        flow().run(&mut transport, &request, RunMode::Observe, handler),
    )
    .await
    .expect("flow timed out")
    .unwrap();

    assert_eq!(report, FlowReport::Observed { frames_seen: 1 });
    assert_eq!(frames.lock().unwrap().len(), 1);

    let received = gateway.received().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["type"], "lift-call-api-v2");
    assert_eq!(received[0]["buildingId"], "building:4TFxWRCv23D");
    assert_eq!(received[0]["payload"]["request_id"], request.request_id);
    assert_eq!(received[0]["payload"]["call"]["action"], 2);
    assert_eq!(received[0]["payload"]["call"]["destination"], 3000);
}

#[tokio::test]
async fn test_rejected_call_sends_nothing_to_gateway() {
    init_tracing();
    let gateway = FakeGateway::start(GatewayScript::ack_and_close()).await;
    let mut transport = WsTransport::connect(&gateway.url()).await.unwrap();
    let mut request = CallRequest::destination_call(1000, 3000, 1);
    request.source_area = 7000;
    let (_frames, handler) = recorder();

    let report = flow()
        .run(&mut transport, &request, RunMode::Observe, handler)
        .await
        .unwrap();

    assert_eq!(
        report,
        FlowReport::Refused(ValidationOutcome::Rejected {
            reason: "unable to resolve area: area:7000".to_string()
        })
    );

    transport.close().await.unwrap();
    let received = timeout(Duration::from_secs(5), gateway.finish())
        .await
        .expect("gateway never saw the close");
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_cancel_sequence_over_websocket() {
    init_tracing();
    let gateway = FakeGateway::start(GatewayScript::with_session("abc")).await;
    let mut transport = WsTransport::connect(&gateway.url()).await.unwrap();
    let request = CallRequest::destination_call(1000, 3000, 1);
    let (frames, handler) = recorder();

    let started = Instant::now();
    let report = timeout(
        Duration::from_secs(5),
        flow().run(&mut transport, &request, RunMode::CancelTest, handler),
    )
    .await
    .expect("flow timed out")
    .unwrap();
    assert!(started.elapsed() >= CANCEL_DELAY);

    let summary = match report {
        FlowReport::CancelTest(summary) => summary,
        other => panic!("unexpected report: {other:?}"),
    };
    assert!(summary.cancel_sent);
    assert_eq!(summary.session_id.as_deref(), Some("abc"));

    // ack, session, duplicate session, cancel acknowledgement
    let frames = frames.lock().unwrap().clone();
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[3].cancel_reason(), Some("CALL_CANCELLED"));

    let received = gateway.received().await;
    assert_eq!(received.len(), 2);
    assert_eq!(received[0]["callType"], "action");
    assert_eq!(received[1]["callType"], "delete");
    assert_eq!(received[1]["payload"]["session_id"], "abc");
}

#[tokio::test]
async fn test_token_fetch_sends_client_credentials() {
    init_tracing();
    let endpoint = FakeTokenEndpoint::start(
        StatusCode::OK,
        r#"{"access_token":"tok-123","token_type":"Bearer","expires_in":3600}"#,
    )
    .await;

    let mut config = Config::default_config();
    config.gateway.building_id = "4TFxWRCv23D".to_string();
    let credentials = CredentialsConfig {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
    };

    let token = TokenProvider::with_token_url(endpoint.token_url())
        .fetch(&credentials, &config.gateway.token_scopes())
        .await
        .unwrap();
    assert_eq!(token.access_token, "tok-123");

    let requests = endpoint.requests().await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    let authorization = request.authorization.as_deref().unwrap_or_default();
    assert!(authorization.starts_with("Basic "), "got {authorization:?}");
    assert_eq!(
        request.form.get("grant_type").map(String::as_str),
        Some("client_credentials")
    );
    assert_eq!(
        request.form.get("scope").map(String::as_str),
        Some("application/inventory callgiving/group:4TFxWRCv23D:1")
    );
}

#[tokio::test]
async fn test_token_rejection_is_credential_failure() {
    init_tracing();
    let endpoint =
        FakeTokenEndpoint::start(StatusCode::UNAUTHORIZED, r#"{"error":"invalid_client"}"#).await;
    let credentials = CredentialsConfig {
        client_id: "client".to_string(),
        client_secret: "wrong".to_string(),
    };

    let err = TokenProvider::with_token_url(endpoint.token_url())
        .fetch(&credentials, &["application/inventory".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Credential(ref msg) if msg.contains("invalid_client")));
}
