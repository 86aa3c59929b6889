//! Relay HTTP/WebSocket server.
//!
//! Agents connect on `/ws/{client_id}` with the shared passcode; the relay
//! authenticates against a SHA-256 reference digest, registers the peer, and
//! fans commands out to everyone. A small HTTP surface serves the controller
//! page and lets a non-peer inject commands via `/execute`.

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::RelayConfig;
use crate::domain::{Envelope, PeerStatus};
use crate::error::{Result, StrutError};
use crate::relay::registry::Registry;

const CONTROLLER_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>strut relay</title></head>
<body>
<h1>strut relay</h1>
<p>Connected agents: <code>GET /clients</code></p>
<p>Send a command to all agents:</p>
<pre>curl -X POST /execute -H 'Content-Type: application/json' -d '{"type": "triangle"}'</pre>
</body>
</html>
"#;

/// Shared state handed to every handler.
pub struct RelayState {
    pub registry: Registry,
    passcode_sha256: String,
}

/// The relay server: owns the registry and the auth reference digest.
pub struct RelayServer {
    state: Arc<RelayState>,
    bind: String,
}

impl RelayServer {
    pub fn new(config: &RelayConfig) -> Self {
        if config.passcode_sha256.is_empty() {
            warn!("No passcode digest configured; every connection will be rejected");
        }
        Self {
            state: Arc::new(RelayState {
                registry: Registry::new(),
                passcode_sha256: config.passcode_sha256.to_lowercase(),
            }),
            bind: config.bind.clone(),
        }
    }

    /// Build the router. Exposed separately so tests can drive it without a
    /// listening socket.
    pub fn router(state: Arc<RelayState>) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/clients", get(clients_handler))
            .route("/execute", post(execute_handler))
            .route("/ws/:client_id", get(ws_handler))
            .layer(tower_http::cors::CorsLayer::permissive())
            .with_state(state)
    }

    pub fn state(&self) -> Arc<RelayState> {
        Arc::clone(&self.state)
    }

    /// Bind and serve until the process is stopped.
    pub async fn run(&self) -> Result<()> {
        let app = Self::router(Arc::clone(&self.state));
        info!("Starting relay server on {}", self.bind);

        let listener = tokio::net::TcpListener::bind(&self.bind).await?;
        axum::serve(listener, app)
            .await
            .map_err(|e| StrutError::Internal(format!("Relay server error: {}", e)))?;

        Ok(())
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(CONTROLLER_PAGE)
}

#[derive(Serialize)]
struct ClientsResponse {
    clients: Vec<String>,
}

async fn clients_handler(State(state): State<Arc<RelayState>>) -> impl IntoResponse {
    let clients = state.registry.active_ids().await;
    Json(ClientsResponse { clients })
}

#[derive(Deserialize)]
struct ExecuteRequest {
    #[serde(rename = "type")]
    command: String,
}

#[derive(Serialize)]
struct ExecuteResponse {
    message: String,
}

/// Server-initiated command broadcast: the only way to inject a command
/// without being a WebSocket peer.
async fn execute_handler(
    State(state): State<Arc<RelayState>>,
    Json(request): Json<ExecuteRequest>,
) -> impl IntoResponse {
    info!(command = %request.command, "Executing command broadcast");
    match state
        .registry
        .broadcast(&Envelope::command(request.command.as_str()))
        .await
    {
        Ok(attempts) => Json(ExecuteResponse {
            message: format!("Command sent to {} clients", attempts),
        }),
        Err(e) => {
            error!("Command broadcast failed: {}", e);
            Json(ExecuteResponse {
                message: "Command broadcast failed".to_string(),
            })
        }
    }
}

#[derive(Deserialize)]
struct WsAuth {
    passcode: Option<String>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    Query(auth): Query<WsAuth>,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, client_id, auth.passcode))
}

async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<RelayState>,
    client_id: String,
    passcode: Option<String>,
) {
    let authorized = passcode
        .as_deref()
        .map(|p| passcode_matches(p, &state.passcode_sha256))
        .unwrap_or(false);

    if !authorized {
        warn!(id = %client_id, "Rejecting connection: bad or missing passcode");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: "invalid passcode".into(),
            })))
            .await;
        return;
    }

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    state.registry.insert(&client_id, tx.clone()).await;
    info!(id = %client_id, "Client connected");
    state
        .registry
        .broadcast_status(&client_id, PeerStatus::Connected)
        .await;

    // Forward queued outbound messages to this socket
    let send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Disconnect is detected here, on the receive path, and nowhere else
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => handle_frame(&state, &client_id, &tx, &text).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    state.registry.remove(&client_id).await;
    info!(id = %client_id, "Client disconnected");
    state
        .registry
        .broadcast_status(&client_id, PeerStatus::Disconnected)
        .await;
}

/// Process one inbound frame from a peer. Malformed payloads are dropped
/// without closing the connection; commands are fanned out to every peer;
/// anything else is acknowledged to the sender only.
async fn handle_frame(
    state: &Arc<RelayState>,
    client_id: &str,
    reply: &mpsc::UnboundedSender<String>,
    text: &str,
) {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(id = %client_id, "Dropping malformed frame: {}", e);
            return;
        }
    };

    match envelope {
        Envelope::Command { command } => {
            info!(id = %client_id, command = %command, "Relaying peer command");
            if let Err(e) = state.registry.broadcast(&Envelope::command(command)).await {
                error!(id = %client_id, "Peer command broadcast failed: {}", e);
            }
        }
        _ => {
            let echo = Envelope::echo(format!("Message received: {}", text));
            match serde_json::to_string(&echo) {
                Ok(json) => {
                    let _ = reply.send(json);
                }
                Err(e) => error!("Failed to serialize echo: {}", e),
            }
        }
    }
}

/// Compare the SHA-256 digest of a presented passcode against the reference
/// digest without short-circuiting on the first mismatched byte.
fn passcode_matches(presented: &str, reference_hex: &str) -> bool {
    let digest = hex::encode(Sha256::digest(presented.as_bytes()));
    constant_time_eq(digest.as_bytes(), reference_hex.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    // SHA-256 of "let-us-dance"
    const REFERENCE_DIGEST: &str =
        "a14bdc258c15416e2b79763733003a33065d5603fa8bb35abc8c428961aab7aa";

    fn test_server() -> RelayServer {
        RelayServer::new(&RelayConfig {
            bind: "127.0.0.1:0".to_string(),
            passcode_sha256: REFERENCE_DIGEST.to_string(),
        })
    }

    #[test]
    fn test_passcode_matches_reference() {
        assert!(passcode_matches("let-us-dance", REFERENCE_DIGEST));
        assert!(!passcode_matches("wrong", REFERENCE_DIGEST));
        assert!(!passcode_matches("", REFERENCE_DIGEST));
        // Unconfigured digest rejects everything
        assert!(!passcode_matches("let-us-dance", ""));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }

    #[tokio::test]
    async fn test_clients_endpoint_empty() {
        let server = test_server();
        let app = RelayServer::router(server.state());

        let response = app
            .oneshot(Request::get("/clients").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"clients":[]}"#);
    }

    #[tokio::test]
    async fn test_execute_broadcasts_to_registered_peers() {
        let server = test_server();
        let state = server.state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.registry.insert("605", tx).await;

        let app = RelayServer::router(server.state());
        let response = app
            .oneshot(
                Request::post("/execute")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"type":"triangle"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let delivered: Envelope = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(delivered, Envelope::command("triangle"));
    }

    #[tokio::test]
    async fn test_index_serves_page() {
        let server = test_server();
        let app = RelayServer::router(server.state());

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
