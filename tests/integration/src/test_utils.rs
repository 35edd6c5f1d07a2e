//! Test utilities: a local fake lift-call gateway and token endpoint

use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};
use tracing::{info, warn};

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// How the fake gateway answers a call message
#[derive(Debug, Clone)]
pub struct GatewayScript {
    /// Frames sent back after each `action` message
    pub replies_to_call: Vec<Value>,
    /// Close the stream right after replying to the call
    pub close_after_call: bool,
}

impl GatewayScript {
    /// Acknowledge the call, then report the session twice
    pub fn with_session(session_id: &str) -> Self {
        Self {
            replies_to_call: vec![
                json!({ "statusCode": 201, "data": { "time": "2026-01-01T00:00:00.000Z" } }),
                json!({ "data": { "sessionId": session_id, "call_types": ["action", "delete"] } }),
                json!({ "data": { "sessionId": "late-duplicate" } }),
            ],
            close_after_call: false,
        }
    }

    /// Acknowledge the call and hang up
    pub fn ack_and_close() -> Self {
        Self {
            replies_to_call: vec![json!({ "statusCode": 201, "data": { "time": "t" } })],
            close_after_call: true,
        }
    }
}

/// Single-connection fake gateway
pub struct FakeGateway {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Value>>>,
    task: JoinHandle<()>,
}

impl FakeGateway {
    /// Bind on an ephemeral port and serve one client with `script`
    pub async fn start(script: GatewayScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake gateway");
        let addr = listener.local_addr().expect("Failed to read local address");
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&received);
        let task = tokio::spawn(async move {
            if let Ok((stream, peer_addr)) = listener.accept().await {
                info!("Fake gateway connection from {}", peer_addr);
                if let Err(e) = serve(stream, script, log).await {
                    warn!("Fake gateway connection error: {}", e);
                }
            }
        });

        Self {
            addr,
            received,
            task,
        }
    }

    /// `ws://` URL of the gateway
    pub fn url(&self) -> String {
        format!("ws://{}/stream-v2?accessToken=test-token", self.addr)
    }

    /// Messages received from the client so far
    pub async fn received(&self) -> Vec<Value> {
        self.received.lock().await.clone()
    }

    /// Wait for the connection to end, then return everything received
    pub async fn finish(self) -> Vec<Value> {
        if let Err(e) = self.task.await {
            warn!("Fake gateway task failed: {}", e);
        }
        self.received.lock().await.clone()
    }
}

async fn serve(
    stream: TcpStream,
    script: GatewayScript,
    received: Arc<Mutex<Vec<Value>>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let echo_subprotocol = |request: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
        if let Some(protocol) = request.headers().get("Sec-WebSocket-Protocol") {
            let protocol: HeaderValue = protocol.clone();
            response.headers_mut().insert("Sec-WebSocket-Protocol", protocol);
        }
        Ok(response)
    };
    let ws_stream = accept_hdr_async(stream, echo_subprotocol).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    while let Some(msg) = ws_receiver.next().await {
        let text = match msg? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let value: Value = serde_json::from_str(&text)?;
        let call_type = value["callType"].as_str().unwrap_or_default().to_string();
        received.lock().await.push(value);

        match call_type.as_str() {
            "action" => {
                for reply in &script.replies_to_call {
                    ws_sender.send(Message::Text(reply.to_string())).await?;
                }
                if script.close_after_call {
                    ws_sender.send(Message::Close(None)).await?;
                    break;
                }
            }
            "delete" => {
                let reply = json!({ "data": { "cancelReason": "CALL_CANCELLED" } });
                ws_sender.send(Message::Text(reply.to_string())).await?;
                ws_sender.send(Message::Close(None)).await?;
                break;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Token request as seen by the fake endpoint
#[derive(Debug, Clone, Default)]
pub struct CapturedTokenRequest {
    pub authorization: Option<String>,
    pub form: HashMap<String, String>,
}

#[derive(Clone)]
struct TokenEndpointState {
    status: StatusCode,
    body: &'static str,
    requests: Arc<Mutex<Vec<CapturedTokenRequest>>>,
}

/// OAuth2 token endpoint answering every request with a fixed status and body
pub struct FakeTokenEndpoint {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<CapturedTokenRequest>>>,
}

impl FakeTokenEndpoint {
    /// Serve `POST /api/v2/oauth2/token` on an ephemeral port
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = TokenEndpointState {
            status,
            body,
            requests: Arc::clone(&requests),
        };
        let app = Router::new()
            .route("/api/v2/oauth2/token", post(issue_token))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind token endpoint");
        let addr = listener.local_addr().expect("Failed to read local address");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!("Fake token endpoint error: {}", e);
            }
        });

        Self { addr, requests }
    }

    /// Full token URL
    pub fn token_url(&self) -> String {
        format!("http://{}/api/v2/oauth2/token", self.addr)
    }

    /// Requests handled so far
    pub async fn requests(&self) -> Vec<CapturedTokenRequest> {
        self.requests.lock().await.clone()
    }
}

async fn issue_token(
    State(state): State<TokenEndpointState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state
        .requests
        .lock()
        .await
        .push(CapturedTokenRequest { authorization, form });

    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body,
    )
}
