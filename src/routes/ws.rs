// WebSocket: stream log volume snapshots for one datasource

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{Duration, timeout};

use super::AppState;
use super::http::{client_error_response, store_error_response};
use crate::logs_volume::{LogsVolumeProvider, LogsVolumeStream};
use crate::models::{LogsVolume, QueryRequest};
use crate::query_client::QueryClient;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Messages accepted from the client.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Replace the base request and start a new volume query.
    Query { request: QueryRequest },
    /// Re-run the current request, superseding the one in flight.
    Refresh,
}

/// Messages sent to the client besides snapshots.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ServerNotice<'a> {
    Error { message: &'a str },
}

pub(super) async fn ws_logs_volume(
    ws: WebSocketUpgrade,
    Path(uid): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let ds = match state.store.get(&uid).await {
        Ok(ds) => ds,
        Err(e) => return store_error_response(e),
    };
    let client = match state.clients.client_for(&ds) {
        Ok(c) => c,
        Err(e) => return client_error_response(e),
    };
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_logs_volume(socket, client, &uid).await {
            tracing::info!(uid = %uid, "logs volume stream error: {}", e);
        }
    })
    .into_response()
}

/// Next snapshot of the current stream; pending forever when there is none.
async fn next_snapshot(current: &mut Option<LogsVolumeStream>) -> Option<LogsVolume> {
    let Some(stream) = current.as_mut() else {
        return std::future::pending().await;
    };
    let snapshot = stream.next().await;
    if snapshot.is_none() {
        *current = None;
    }
    snapshot
}

/// Sends a text frame; false if the client is gone or too slow.
async fn send_text(socket: &mut WebSocket, text: String) -> bool {
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(text.into()))).await;
    matches!(r, Ok(Ok(())))
}

async fn stream_logs_volume(
    mut socket: WebSocket,
    client: Arc<dyn QueryClient>,
    uid: &str,
) -> anyhow::Result<()> {
    tracing::info!(uid = %uid, "Client connected to logs volume stream");
    let mut provider: Option<LogsVolumeProvider> = None;
    let mut current: Option<LogsVolumeStream> = None;

    let first_ping = tokio::time::Instant::now() + WS_PING_INTERVAL;
    let mut ping_interval = tokio::time::interval_at(first_ping, WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                };
                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(ClientMessage::Query { request }) => {
                        // Drop the old stream first so its upstream is released before dispatch.
                        drop(current.take());
                        let p = provider.insert(LogsVolumeProvider::new(client.clone(), request));
                        current = Some(p.get_data());
                    }
                    Ok(ClientMessage::Refresh) => match provider.as_mut() {
                        Some(p) => current = Some(p.get_data()),
                        None => {
                            let notice = serde_json::to_string(&ServerNotice::Error {
                                message: "refresh before query",
                            })?;
                            if !send_text(&mut socket, notice).await {
                                break;
                            }
                        }
                    },
                    Err(e) => {
                        let message = format!("invalid message: {}", e);
                        let notice = serde_json::to_string(&ServerNotice::Error { message: &message })?;
                        if !send_text(&mut socket, notice).await {
                            break;
                        }
                    }
                }
            }
            Some(snapshot) = next_snapshot(&mut current) => {
                let json = serde_json::to_string(&snapshot)?;
                if !send_text(&mut socket, json).await {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
        }
    }
    tracing::info!(uid = %uid, "Client disconnected from logs volume stream");
    Ok(())
}
