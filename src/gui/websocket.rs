//! WebSocket endpoint pushing `log-changed` and `commit` events to the dashboard.
//!
//! Browsers do not apply CORS to WebSocket upgrades, so the handshake checks
//! the `Origin` header itself. Clients that send no origin (CLI tools) are
//! accepted.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::broadcast::error::RecvError;

use super::server::{AppState, is_local_origin};

fn origin_allowed(headers: &HeaderMap) -> bool {
    match headers.get(header::ORIGIN) {
        None => true,
        Some(origin) => origin.to_str().is_ok_and(is_local_origin),
    }
}

pub async fn ws_handler(
    headers: HeaderMap,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    if !origin_allowed(&headers) {
        tracing::warn!(origin = ?headers.get(header::ORIGIN), "rejected websocket from foreign origin");
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.update_tx.subscribe();

    let hello = serde_json::json!({ "type": "connected", "version": env!("CARGO_PKG_VERSION") });
    if sender.send(Message::Text(hello.to_string())).await.is_err() {
        return;
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                // A slow client missed some events; the next one still refreshes it.
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "websocket client lagging");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }
}
