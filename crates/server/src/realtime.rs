//! WebSocket transport for the product notifier.
//!
//! Each connection registers one subscriber, receives the current product
//! list right away and then every broadcast. Frames are JSON envelopes
//! `{"event": ..., "data": ...}`. Clients may create (`agregarProducto`) or
//! delete (`eliminarProducto`) products over the socket; those go through
//! the same catalog operations as HTTP, so the resulting broadcast reaches
//! every subscriber including the sender. Failures are reported to the
//! sender only, as an `error` event.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use storefront_core::{CatalogService, NotifierEvent, ProductId, ProductInput};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

/// Messages accepted from a connected client.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "agregarProducto")]
    AddProduct(ProductInput),
    #[serde(rename = "eliminarProducto")]
    RemoveProduct(ProductId),
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| session(socket, state.catalog))
}

async fn session(mut socket: WebSocket, catalog: CatalogService) {
    let mut subscription = match catalog.subscribe().await {
        Ok(subscription) => subscription,
        Err(error) => {
            warn!(
                event_name = "realtime.subscribe.failed",
                error = %error,
                "could not load initial product list for subscriber"
            );
            let event = failure_event(error);
            let _ = send_event(&mut socket, &event).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    info!(
        event_name = "realtime.connected",
        subscriber_id = %subscription.id,
        "subscriber connected"
    );

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            outgoing = subscription.receiver.recv() => {
                let Some(event) = outgoing else { break };
                if send_event(&mut sink, &event).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_client_message(&catalog, text.as_str()).await {
                            if send_event(&mut sink, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        debug!(
                            event_name = "realtime.receive.failed",
                            subscriber_id = %subscription.id,
                            error = %error,
                            "websocket receive failed"
                        );
                        break;
                    }
                }
            }
        }
    }

    catalog.notifier().unsubscribe(subscription.id);
    info!(
        event_name = "realtime.disconnected",
        subscriber_id = %subscription.id,
        "subscriber disconnected"
    );
}

/// Runs one client message. Returns an event for the sender when the
/// message could not be applied; successful changes are announced by the
/// catalog broadcast instead.
pub async fn handle_client_message(catalog: &CatalogService, raw: &str) -> Option<NotifierEvent> {
    let event = match serde_json::from_str::<ClientEvent>(raw) {
        Ok(event) => event,
        Err(error) => {
            return Some(NotifierEvent::Error { error: format!("unsupported message: {error}") });
        }
    };

    let outcome = match event {
        ClientEvent::AddProduct(input) => catalog.create(input).await.map(|_| ()),
        ClientEvent::RemoveProduct(id) => catalog.remove(&id).await,
    };
    outcome.err().map(failure_event)
}

fn failure_event(error: storefront_core::ApplicationError) -> NotifierEvent {
    let interface = error.into_interface(Uuid::new_v4().to_string());
    NotifierEvent::Error { error: interface.user_message().to_string() }
}

async fn send_event<S>(sink: &mut S, event: &NotifierEvent) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(event_name = "realtime.encode.failed", error = %error, "could not encode event");
            return Ok(());
        }
    };
    sink.send(Message::Text(payload.into())).await.map_err(|_| ())
}
