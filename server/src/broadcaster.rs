use tokio::sync::{mpsc, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use common::protocol::ServerMessage;
use common::room::RoomView;
use common::{log, PlayerId};

use crate::message_handler::RoomBroadcast;

pub type ClientSender = mpsc::Sender<ServerMessage>;

/// Outbound channels of connected socket clients, keyed by player.
///
/// Delivery is best effort: a failed send is logged and otherwise ignored,
/// the state change that produced the message stands.
#[derive(Clone)]
pub struct Broadcaster {
    clients: Arc<Mutex<HashMap<PlayerId, ClientSender>>>,
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster").finish()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A newer connection for the same player replaces the older one.
    pub async fn register(&self, player_id: PlayerId, sender: ClientSender) {
        self.clients.lock().await.insert(player_id, sender);
    }

    /// Removes the player's channel only if it is still `sender`, so a closing
    /// stale socket cannot unregister the connection that replaced it.
    /// Returns `false` when a newer connection owns the player.
    pub async fn unregister(&self, player_id: &PlayerId, sender: &ClientSender) -> bool {
        let mut clients = self.clients.lock().await;
        if clients.get(player_id).is_some_and(|current| current.same_channel(sender)) {
            clients.remove(player_id);
            true
        } else {
            false
        }
    }

    pub async fn is_connected(&self, player_id: &PlayerId) -> bool {
        self.clients.lock().await.contains_key(player_id)
    }

    pub async fn broadcast_to_room(&self, room: &RoomView, message: ServerMessage, except: Option<&PlayerId>) {
        let recipients: Vec<(PlayerId, ClientSender)> = {
            let clients = self.clients.lock().await;
            room.players
                .iter()
                .filter(|player| Some(&player.id) != except)
                .filter_map(|player| clients.get(&player.id).map(|sender| (player.id.clone(), sender.clone())))
                .collect()
        };

        for (player_id, sender) in recipients {
            if let Err(e) = sender.send(message.clone()).await {
                log!("[room:{}] Failed to send to player {}: {}", room.id, player_id, e);
            }
        }
    }

    pub async fn deliver(&self, broadcast: RoomBroadcast) {
        self.broadcast_to_room(&broadcast.room, broadcast.message, broadcast.except.as_ref())
            .await;
    }

    pub async fn broadcast_to_all(&self, message: ServerMessage) {
        let recipients: Vec<(PlayerId, ClientSender)> = self
            .clients
            .lock()
            .await
            .iter()
            .map(|(id, sender)| (id.clone(), sender.clone()))
            .collect();

        for (player_id, sender) in recipients {
            if let Err(e) = sender.send(message.clone()).await {
                log!("Failed to broadcast to player {}: {}", player_id, e);
            }
        }
    }
}
