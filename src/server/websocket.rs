//! WebSocket transport for chat sessions.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{
    future,
    stream::{SplitSink, SplitStream},
    SinkExt, Stream, StreamExt,
};
use tokio::sync::mpsc;

use super::AppState;
use crate::error::ChatRelayError;
use crate::session::Outbox;
use crate::Result;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one chat connection until it closes.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    let (outbox, rx) = Outbox::channel();
    let writer = tokio::spawn(write_lines(rx, sink));

    let session = match state.registry.open_session(outbox) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Failed to register session: {}", e);
            writer.abort();
            return;
        }
    };

    let id = session.id();
    if let Err(e) = session.run(read_lines(stream)).await {
        tracing::warn!(session = %id, error = %e, "session ended by transport failure");
    }

    // The session's outbox is gone now, so the writer drains and stops.
    if let Err(e) = writer.await {
        tracing::debug!(session = %id, error = %e, "writer task failed");
    }
}

/// Forward queued lines to the socket.
///
/// Stops at the first failed write; dropping `rx` then marks the session's
/// outbox closed.
async fn write_lines(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sink: SplitSink<WebSocket, Message>,
) {
    while let Some(line) = rx.recv().await {
        if sink.send(Message::Text(line.into())).await.is_err() {
            return;
        }
    }
    let _ = sink.close().await;
}

/// Adapt inbound frames to a stream of text lines.
///
/// Close frames end the stream; control and binary frames are skipped.
fn read_lines(stream: SplitStream<WebSocket>) -> impl Stream<Item = Result<String>> {
    stream
        .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(Ok(text.to_string())),
                Ok(_) => None,
                Err(e) => Some(Err(ChatRelayError::WebSocket(e.to_string()))),
            })
        })
}
