use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use fsmapper::types::BAD_REQUEST;
use fsmapper::{FsMapper, Request, Response};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::server::ServerState;

pub(crate) async fn ws_handler(
    State(state): State<Arc<ServerState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: Arc<ServerState>, socket: WebSocket) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tracing::debug!("socket connected");

    // Write task: forward answers to the WebSocket in completion order.
    let write_task = async move {
        while let Some(msg) = rx.recv().await {
            if ws_sink.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    };

    // Read task: each request is answered on its own task so a slow crawl
    // does not hold up later requests.
    let mapper = state.mapper.clone();
    let read_task = async move {
        while let Some(Ok(msg)) = ws_stream.next().await {
            match msg {
                Message::Text(text) => {
                    let mapper = mapper.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let answer = handle_text(&mapper, &text).await;
                        let _ = tx.send(answer);
                    });
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    };

    tokio::select! {
        _ = write_task => {},
        _ = read_task => {},
    }
    tracing::debug!("socket disconnected");
}

/// Answers one text frame with one text frame.
pub(crate) async fn handle_text(mapper: &FsMapper, text: &str) -> String {
    let response = match serde_json::from_str::<Request>(text) {
        Ok(request) => mapper.process(request).await,
        Err(error) => Response::error(BAD_REQUEST, format!("malformed request: {error}")),
    };
    encode(&response)
}

pub(crate) fn encode(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|error| {
        tracing::error!("failed to encode response: {error}");
        r#"{"error":500,"message":"failed to encode response"}"#.to_string()
    })
}
