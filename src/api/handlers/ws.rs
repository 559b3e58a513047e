//! Websocket endpoint for realtime clients.
//!
//! Each connection gets its own bus subscription plus a room set; a
//! client that joins specific stations only receives station-scoped
//! events for those, while a client with no rooms receives everything.

use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use tokio::select;
use tracing::{debug, info, warn};

use crate::api::router::AppState;
use crate::realtime::{ClientIntent, EventEnvelope, RealtimeEvent};

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Whether an envelope should reach a client with the given room set.
fn should_deliver(rooms: &HashSet<String>, envelope: &EventEnvelope) -> bool {
    if matches!(envelope.event, RealtimeEvent::Unknown) {
        return false;
    }
    match envelope.event.station_id() {
        Some(station_id) => rooms.is_empty() || rooms.contains(station_id),
        None => true,
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    use futures_util::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut subscriber = state.event_bus.subscribe();
    let mut rooms: HashSet<String> = HashSet::new();

    let welcome = serde_json::json!({
        "type": "connected",
        "message": "connected to event stream",
    });
    if sender
        .send(Message::Text(welcome.to_string().into()))
        .await
        .is_err()
    {
        return;
    }
    info!("realtime client connected");

    loop {
        select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientIntent>(&text) {
                            Ok(ClientIntent::JoinStation { station_id }) => {
                                debug!(%station_id, "client joined station room");
                                rooms.insert(station_id);
                            }
                            Ok(ClientIntent::LeaveStation { station_id }) => {
                                debug!(%station_id, "client left station room");
                                rooms.remove(&station_id);
                            }
                            Err(e) => debug!(error = %e, "ignoring unrecognized client frame"),
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if sender.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket error");
                        break;
                    }
                }
            }

            event = subscriber.recv() => {
                let Some(envelope) = event else { break };
                if !should_deliver(&rooms, &envelope) {
                    continue;
                }
                match serde_json::to_string(&envelope) {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to serialize event"),
                }
            }
        }
    }

    info!("realtime client disconnected");
}
