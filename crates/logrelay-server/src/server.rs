use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use logrelay_adapters::StreamHub;
use logrelay_core::subject::LOGS_STREAM;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::auth::{Session, TokenVerifier};

/// First frame a viewer sends
#[derive(Debug, Deserialize)]
struct Handshake {
    token: String,
    #[serde(default)]
    stream: Option<String>,
}

/// Outcome of the handshake, sent back as `{"status": ...}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Unauthorized,
    InvalidStream,
    BadRequest,
}

impl Status {
    pub fn body(&self) -> &'static str {
        match self {
            Status::Ok => r#"{"status":"ok"}"#,
            Status::Unauthorized => r#"{"status":"unauthorized"}"#,
            Status::InvalidStream => r#"{"status":"invalid stream"}"#,
            Status::BadRequest => r#"{"status":"bad request"}"#,
        }
    }
}

#[derive(Clone)]
struct AppState {
    hub: StreamHub,
    verifier: Arc<TokenVerifier>,
    shutdown: CancellationToken,
}

pub struct StreamServer {
    state: AppState,
}

impl StreamServer {
    pub fn new(hub: StreamHub, jwt_secret: &str, shutdown: CancellationToken) -> Self {
        Self {
            state: AppState {
                hub,
                verifier: Arc::new(TokenVerifier::new(jwt_secret)),
                shutdown,
            },
        }
    }

    pub fn router(&self) -> Router {
        // Viewers connect from the web UI on another origin
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/logs", get(handle_logs))
            .route("/health", get(handle_health))
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Bind and serve until the shutdown token is cancelled.
    pub async fn serve(self, host: &str, port: u16) -> anyhow::Result<()> {
        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind live stream server on {}", addr))?;

        info!("Live stream server listening on {}", addr);

        let shutdown = self.state.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        Ok(())
    }
}

/// Validate a handshake frame and open the requested stream.
fn authorize(
    state: &AppState,
    frame: &str,
) -> Result<(Session, broadcast::Receiver<String>), Status> {
    let handshake: Handshake = serde_json::from_str(frame).map_err(|_| Status::BadRequest)?;
    let session = state.verifier.verify(&handshake.token).map_err(|err| {
        debug!(error = %err, "viewer rejected");
        Status::Unauthorized
    })?;
    let stream = handshake.stream.as_deref().unwrap_or(LOGS_STREAM);
    let records = state.hub.subscribe(stream).ok_or(Status::InvalidStream)?;
    Ok((session, records))
}

/// GET /health
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "logrelay",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /logs - websocket feed of a live stream
async fn handle_logs(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_to_viewer(socket, state))
}

async fn stream_to_viewer(mut socket: WebSocket, state: AppState) {
    let frame = match socket.recv().await {
        Some(Ok(Message::Text(text))) => text,
        _ => {
            reject(socket, Status::BadRequest).await;
            return;
        }
    };

    let (session, mut records) = match authorize(&state, &frame) {
        Ok(accepted) => accepted,
        Err(status) => {
            reject(socket, status).await;
            return;
        }
    };
    if send_status(&mut socket, Status::Ok).await.is_err() {
        return;
    }
    info!(user = %session.username, "viewer connected");

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            record = records.recv() => match record {
                Ok(payload) => {
                    if socket.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user = %session.username, skipped, "viewer lagging");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = socket.send(Message::Close(None)).await;
    info!(user = %session.username, "viewer disconnected");
}

async fn send_status(socket: &mut WebSocket, status: Status) -> Result<(), axum::Error> {
    socket.send(Message::Text(status.body().to_string())).await
}

async fn reject(mut socket: WebSocket, status: Status) {
    let _ = send_status(&mut socket, status).await;
    let _ = socket.send(Message::Close(None)).await;
}
