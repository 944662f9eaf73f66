use axum::extract::ws::WebSocket;
use axum::{
    extract::{ws::Message, State, WebSocketUpgrade},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tracing::{error, info};

use crate::handlers;
use crate::state::{AppState, SessionContext};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_uid = state.generate_session_uid();
    info!("New WebSocket connection: {}", session_uid);

    state
        .sessions
        .insert(session_uid.clone(), SessionContext::new(session_uid.clone()));

    let (mut sender, mut receiver) = socket.split();

    // The page learns its session id and the model label from this message;
    // every caption it shows is derived from that label.
    let server_info = json!({
        "type": "server-info",
        "session_uid": session_uid,
        "model": state.config.analysis_config.model
    });
    if let Err(e) = sender.send(Message::Text(server_info.to_string())).await {
        error!("Failed to send server info: {}", e);
        state.sessions.remove(&session_uid);
        return;
    }

    // Messages are handled one at a time, so an analysis in flight blocks
    // the loop and a session never has two upstream calls running.
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(e) =
                    handlers::handle_message(&state, &session_uid, &text, &mut sender).await
                {
                    error!("Error handling message: {}", e);
                }
            }
            Ok(Message::Close(_)) => {
                info!("Session {} disconnected", session_uid);
                break;
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    state.sessions.remove(&session_uid);
    info!("Cleaned up session {}", session_uid);
}
