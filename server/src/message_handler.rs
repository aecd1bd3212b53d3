use chrono::Utc;
use common::games::tictactoe::BOARD_CELLS;
use common::protocol::{ClientMessage, GameReset, MoveMade, PlayerDisconnected, PlayerJoined, ServerMessage};
use common::room::RoomView;
use common::{log, GameError, PlayerId, RoomId};

use crate::history::{HistoryStore, NewGameRecord};
use crate::room_store::{JoinResult, RoomStore};

/// A validated client request. Both transports build one of these and hand it to [`MessageHandler::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateRoom,
    JoinRoom { room_id: RoomId },
    MakeMove { room_id: RoomId, position: usize },
    NewGame { room_id: RoomId },
    Ping,
}

pub fn parse_position(position: i64) -> Result<usize, GameError> {
    usize::try_from(position)
        .ok()
        .filter(|&p| p < BOARD_CELLS)
        .ok_or_else(|| GameError::malformed(format!("position must be between 0 and {}, got {}", BOARD_CELLS - 1, position)))
}

impl TryFrom<ClientMessage> for Command {
    type Error = GameError;

    fn try_from(message: ClientMessage) -> Result<Self, Self::Error> {
        match message {
            ClientMessage::CreateRoom => Ok(Command::CreateRoom),
            ClientMessage::JoinRoom { room_id } => Ok(Command::JoinRoom {
                room_id: RoomId::parse(&room_id)?,
            }),
            ClientMessage::MakeMove { room_id, position } => Ok(Command::MakeMove {
                room_id: RoomId::parse(&room_id)?,
                position: parse_position(position)?,
            }),
            ClientMessage::NewGame { room_id } => Ok(Command::NewGame {
                room_id: RoomId::parse(&room_id)?,
            }),
            ClientMessage::Ping => Ok(Command::Ping),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CommandResult {
    RoomCreated(RoomView),
    RoomJoined(JoinResult),
    MoveMade {
        player_id: PlayerId,
        position: usize,
        room: RoomView,
    },
    GameReset(RoomView),
    Pong { timestamp: i64 },
}

/// A message for the occupants of a room, optionally skipping one of them.
#[derive(Debug, Clone)]
pub struct RoomBroadcast {
    pub room: RoomView,
    pub message: ServerMessage,
    pub except: Option<PlayerId>,
}

/// What the push transport sends after a command: a direct reply and/or a room broadcast.
#[derive(Debug, Clone, Default)]
pub struct PushPlan {
    pub reply: Option<ServerMessage>,
    pub broadcast: Option<RoomBroadcast>,
}

impl CommandResult {
    pub fn room(&self) -> Option<&RoomView> {
        match self {
            CommandResult::RoomCreated(room) | CommandResult::GameReset(room) => Some(room),
            CommandResult::RoomJoined(joined) => Some(&joined.room),
            CommandResult::MoveMade { room, .. } => Some(room),
            CommandResult::Pong { .. } => None,
        }
    }

    pub fn into_push_plan(self, requester: &PlayerId) -> PushPlan {
        match self {
            CommandResult::RoomCreated(room) => PushPlan {
                reply: Some(ServerMessage::RoomCreated { data: room }),
                broadcast: None,
            },
            CommandResult::RoomJoined(joined) => PushPlan {
                reply: Some(ServerMessage::RoomJoined { data: joined.room.clone() }),
                broadcast: Some(RoomBroadcast {
                    message: ServerMessage::PlayerJoined {
                        data: PlayerJoined {
                            player: joined.player,
                            room: joined.room.clone(),
                        },
                    },
                    room: joined.room,
                    except: Some(requester.clone()),
                }),
            },
            CommandResult::MoveMade { player_id, position, room } => {
                let message = ServerMessage::MoveMade {
                    data: MoveMade {
                        player_id,
                        position,
                        game_state: room.game_state.clone(),
                    },
                };
                room_wide(room, message, requester)
            }
            CommandResult::GameReset(room) => {
                let message = ServerMessage::GameReset {
                    data: GameReset {
                        game_state: room.game_state.clone(),
                    },
                };
                room_wide(room, message, requester)
            }
            CommandResult::Pong { timestamp } => PushPlan {
                reply: Some(ServerMessage::Pong { timestamp }),
                broadcast: None,
            },
        }
    }
}

/// Everyone in the room hears about it; a requester without a seat gets a direct copy.
fn room_wide(room: RoomView, message: ServerMessage, requester: &PlayerId) -> PushPlan {
    let reply = room.player(requester).is_none().then(|| message.clone());
    PushPlan {
        reply,
        broadcast: Some(RoomBroadcast {
            room,
            message,
            except: None,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct MessageHandler {
    rooms: RoomStore,
    history: HistoryStore,
}

impl MessageHandler {
    pub fn new(rooms: RoomStore, history: HistoryStore) -> Self {
        Self { rooms, history }
    }

    pub fn rooms(&self) -> &RoomStore {
        &self.rooms
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub async fn execute(&self, player_id: &PlayerId, command: Command) -> Result<CommandResult, GameError> {
        match command {
            Command::CreateRoom => {
                let room = self.rooms.create_room(player_id.clone()).await;
                log!("[room:{}] Created by {}", room.id, player_id);
                Ok(CommandResult::RoomCreated(room))
            }
            Command::JoinRoom { room_id } => {
                let joined = self.rooms.join_room(&room_id, player_id).await?;
                if joined.rejoined {
                    log!("[room:{}] {} reconnected as {}", room_id, player_id, joined.player.symbol);
                } else {
                    log!("[room:{}] {} joined as {}", room_id, player_id, joined.player.symbol);
                }
                Ok(CommandResult::RoomJoined(joined))
            }
            Command::MakeMove { room_id, position } => {
                let room = self.rooms.make_move(&room_id, player_id, position).await?;
                if let Some(record) = NewGameRecord::from_room(&room) {
                    let saved = self.history.save(record).await;
                    log!("[room:{}] Game over ({:?}), recorded as #{}", room_id, saved.outcome, saved.id);
                }
                Ok(CommandResult::MoveMade {
                    player_id: player_id.clone(),
                    position,
                    room,
                })
            }
            Command::NewGame { room_id } => {
                let room = self.rooms.reset_game(&room_id).await?;
                log!("[room:{}] New game requested by {}", room_id, player_id);
                Ok(CommandResult::GameReset(room))
            }
            Command::Ping => Ok(CommandResult::Pong {
                timestamp: Utc::now().timestamp_millis(),
            }),
        }
    }

    /// Socket closed: the player keeps their seats but is shown as disconnected.
    pub async fn handle_disconnect(&self, player_id: &PlayerId) -> Vec<RoomBroadcast> {
        self.rooms
            .disconnect_everywhere(player_id)
            .await
            .into_iter()
            .map(|(player, room)| {
                log!("[room:{}] {} disconnected", room.id, player_id);
                disconnected_broadcast(player, room)
            })
            .collect()
    }

    /// Explicit leave from the polling transport, limited to one room.
    pub async fn handle_leave(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<RoomBroadcast, GameError> {
        let (player, room) = self.rooms.mark_disconnected(room_id, player_id).await?;
        log!("[room:{}] {} left", room_id, player_id);
        Ok(disconnected_broadcast(player, room))
    }
}

fn disconnected_broadcast(player: common::room::Player, room: RoomView) -> RoomBroadcast {
    RoomBroadcast {
        message: ServerMessage::PlayerDisconnected {
            data: PlayerDisconnected {
                player_id: player.id.clone(),
                player: player.clone(),
            },
        },
        except: Some(player.id),
        room,
    }
}
