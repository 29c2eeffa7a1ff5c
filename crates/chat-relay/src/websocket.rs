//! WebSocket handler for relay clients.

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use chat_core::{ChatMessage, codec};
use futures::{SinkExt, StreamExt};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::hub::Hub;

/// WebSocket upgrade handler.
///
/// Use this as an Axum route handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Hub>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: Hub) {
    let (mut sender, mut receiver) = socket.split();
    let (registration, mut feed) = hub.register();
    let client = registration.id();

    tracing::info!(%client, clients = hub.client_count(), "Client connected");

    // Spawn task to forward broadcasts to this client
    let send_task = tokio::spawn(async move {
        while let Some(next) = feed.next().await {
            let msg = match next {
                Ok(msg) => msg,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(%client, skipped, "Client lagging, messages dropped");
                    continue;
                }
            };
            let frame = codec::encode(msg.body());
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s,
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::error!(%client, "WebSocket error: {e}");
                break;
            }
        };

        match inbound_message(&text) {
            Some(msg) => {
                let reached = hub.broadcast(msg);
                tracing::debug!(%client, reached, "Message relayed");
            }
            None => tracing::debug!(%client, "Ignoring empty frame"),
        }
    }

    send_task.abort();
    drop(registration);

    tracing::info!(%client, clients = hub.client_count(), "Client disconnected");
}

/// Normalize an inbound frame.
///
/// Envelopes are decoded; anything else is taken as a raw body so clients
/// that send bare text still reach everyone. Blank frames yield `None`.
#[must_use]
pub fn inbound_message(text: &str) -> Option<ChatMessage> {
    if text.trim().is_empty() {
        return None;
    }
    Some(codec::decode_text(text).unwrap_or_else(|_| ChatMessage::new(text)))
}

/// Create the relay router.
///
/// # Example
/// ```ignore
/// let app = router(Hub::default(), "/ws");
/// axum::serve(listener, app).await?;
/// ```
#[must_use]
pub fn router(hub: Hub, path: &str) -> Router {
    Router::new()
        .route(path, get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(hub)
}
