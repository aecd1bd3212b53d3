use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use common::protocol::{ClientMessage, ServerMessage};
use common::{log, log_error, GameError, PlayerId};

use crate::message_handler::Command;
use crate::web_server::WebServerState;

const OUTBOUND_BUFFER: usize = 128;

pub async fn handle_websocket(socket: WebSocket, state: WebServerState, player_id: PlayerId) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    log_error!("Failed to encode server message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    if state.broadcaster.is_connected(&player_id).await {
        log!("[ws:{}] New connection replaces the previous one", player_id);
    }
    state.broadcaster.register(player_id.clone(), tx.clone()).await;
    log!("WebSocket client connected: {}", player_id);

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_text_message(&state, &tx, &player_id, text.as_str()).await;
            }
            Ok(Message::Binary(_)) => {
                let error = GameError::malformed("binary frames are not supported");
                send_to_client(&tx, ServerMessage::error(&error), &player_id).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                log!("[ws:{}] Socket error: {}", player_id, e);
                break;
            }
        }
    }

    log!("WebSocket client disconnected: {}", player_id);

    // A newer socket for the same player keeps the seats connected.
    if state.broadcaster.unregister(&player_id, &tx).await {
        for broadcast in state.handler.handle_disconnect(&player_id).await {
            state.broadcaster.deliver(broadcast).await;
        }
    } else {
        log!("[ws:{}] Stale connection closed, newer one still active", player_id);
    }

    drop(tx);
    if let Err(e) = send_task.await {
        log_error!("[ws:{}] Writer task failed: {}", player_id, e);
    }
}

async fn handle_text_message(
    state: &WebServerState,
    tx: &mpsc::Sender<ServerMessage>,
    player_id: &PlayerId,
    text: &str,
) {
    let command = ClientMessage::parse(text).and_then(Command::try_from);

    let result = match command {
        Ok(command) => state.handler.execute(player_id, command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(result) => {
            let plan = result.into_push_plan(player_id);
            if let Some(reply) = plan.reply {
                send_to_client(tx, reply, player_id).await;
            }
            if let Some(broadcast) = plan.broadcast {
                state.broadcaster.deliver(broadcast).await;
            }
        }
        Err(e) => {
            log!("[ws:{}] Request rejected: {}", player_id, e);
            send_to_client(tx, ServerMessage::error(&e), player_id).await;
        }
    }
}

async fn send_to_client(tx: &mpsc::Sender<ServerMessage>, message: ServerMessage, player_id: &PlayerId) {
    if let Err(e) = tx.send(message).await {
        log!("[ws:{}] Failed to send message: {}", player_id, e);
    }
}
