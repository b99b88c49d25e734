// Path: crates/http-gateway/src/observe.rs
//! The `/observe` WebSocket: one bridge observation loop per connection.

use crate::AppState;
use aether_services::bridge::{PeerGone, SnapshotSink};
use aether_types::app::UiSnapshot;
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;

struct WsSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl SnapshotSink for WsSink {
    async fn push(&mut self, snapshot: &UiSnapshot) -> Result<(), PeerGone> {
        self.0
            .send(Message::Text(snapshot.as_str().to_owned()))
            .await
            .map_err(|_| PeerGone)
    }
}

pub(crate) async fn observe_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| observe_socket(socket, state))
}

async fn observe_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sink, mut stream) = socket.split();
    let (gone_tx, gone_rx) = watch::channel(false);
    let shutdown = state.shutdown.clone();

    // Inbound frames are ignored; the reader only exists to notice the close.
    let reader = tokio::spawn(async move {
        let server_stopping = async move {
            match shutdown {
                Some(mut rx) => {
                    let _ = rx.wait_for(|stopping| *stopping).await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(server_stopping);
        loop {
            tokio::select! {
                _ = &mut server_stopping => break,
                msg = stream.next() => match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
            }
        }
        let _ = gone_tx.send(true);
    });

    let mut sink = WsSink(sink);
    let outcome = state.bridge.observe(&mut sink, gone_rx).await;
    reader.abort();
    let _ = sink.0.close().await;
    tracing::debug!(
        target: "http-gateway",
        reason = ?outcome.reason,
        frames = outcome.frames,
        "Observer disconnected"
    );
}
