use std::collections::HashMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use common::games::SessionRng;
use common::games::tictactoe::{GameState, Mark};
use common::id_generator::generate_room_id;
use common::room::{Player, RoomSummary, RoomView, MAX_PLAYERS};
use common::{log, GameError, PlayerId, RoomId};

use crate::retention::{KeepForever, RetentionPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Empty,
    WaitingForSecondPlayer,
    InProgress,
    Finished,
}

/// Timestamps are kept at millisecond precision, the resolution clients poll with.
fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(instant.timestamp_millis()).unwrap_or(instant)
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub players: Vec<Player>,
    pub game_state: GameState,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Room {
    pub fn new(id: RoomId, creator: PlayerId, now: DateTime<Utc>) -> Self {
        let now = truncate_to_millis(now);
        Self {
            id,
            players: vec![Player {
                id: creator,
                symbol: Mark::X,
                connected: true,
            }],
            game_state: GameState::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn phase(&self) -> RoomPhase {
        if self.players.is_empty() {
            RoomPhase::Empty
        } else if self.players.len() < MAX_PLAYERS {
            RoomPhase::WaitingForSecondPlayer
        } else if self.game_state.is_finished() {
            RoomPhase::Finished
        } else {
            RoomPhase::InProgress
        }
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == player_id)
    }

    /// Returns the seat and whether it already existed.
    fn join(&mut self, player_id: &PlayerId) -> Result<(Player, bool), GameError> {
        if let Some(existing) = self.players.iter_mut().find(|p| &p.id == player_id) {
            existing.connected = true;
            return Ok((existing.clone(), true));
        }

        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::RoomFull);
        }

        let symbol = [Mark::X, Mark::O]
            .into_iter()
            .find(|mark| self.players.iter().all(|p| p.symbol != *mark))
            .ok_or(GameError::Internal)?;

        let player = Player {
            id: player_id.clone(),
            symbol,
            connected: true,
        };
        self.players.push(player.clone());
        Ok((player, false))
    }

    fn make_move(&mut self, player_id: &PlayerId, position: usize) -> Result<(), GameError> {
        let symbol = self.player(player_id).ok_or(GameError::PlayerNotInRoom)?.symbol;
        self.game_state.place_mark(symbol, position)
    }

    fn reset(&mut self) {
        self.game_state = GameState::new();
    }

    fn mark_disconnected(&mut self, player_id: &PlayerId) -> Result<Player, GameError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| &p.id == player_id)
            .ok_or(GameError::PlayerNotInRoom)?;
        player.connected = false;
        Ok(player.clone())
    }

    /// Advances `last_activity` by at least one millisecond so every change is visible to pollers.
    fn touch(&mut self, now: DateTime<Utc>) {
        let next = now.timestamp_millis().max(self.last_activity.timestamp_millis() + 1);
        self.last_activity = DateTime::from_timestamp_millis(next).unwrap_or(now);
    }

    pub fn to_view(&self) -> RoomView {
        RoomView {
            id: self.id.clone(),
            players: self.players.clone(),
            game_state: self.game_state.clone(),
            created_at: self.created_at.timestamp_millis(),
            last_activity: self.last_activity.timestamp_millis(),
        }
    }

    pub fn to_summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            player_count: self.players.len(),
            game_started: matches!(self.phase(), RoomPhase::InProgress | RoomPhase::Finished),
            created_at: self.created_at.timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinResult {
    pub room: RoomView,
    pub player: Player,
    pub rejoined: bool,
}

struct StoreState {
    rooms: HashMap<RoomId, Room>,
    rng: SessionRng,
}

/// Registry of live rooms. Every operation runs to completion under one lock.
#[derive(Clone)]
pub struct RoomStore {
    state: Arc<Mutex<StoreState>>,
    retention: Arc<dyn RetentionPolicy>,
}

impl std::fmt::Debug for RoomStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomStore").finish()
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new(Arc::new(KeepForever))
    }
}

impl RoomStore {
    pub fn new(retention: Arc<dyn RetentionPolicy>) -> Self {
        Self::with_rng(retention, SessionRng::from_random())
    }

    pub fn with_rng(retention: Arc<dyn RetentionPolicy>, rng: SessionRng) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                rooms: HashMap::new(),
                rng,
            })),
            retention,
        }
    }

    pub fn retention_description(&self) -> String {
        self.retention.describe()
    }

    pub async fn create_room(&self, creator: PlayerId) -> RoomView {
        let mut state = self.state.lock().await;

        let room_id = loop {
            let candidate = generate_room_id(&mut state.rng);
            if !state.rooms.contains_key(&candidate) {
                break candidate;
            }
            log!("[room:{}] Generated id already in use, retrying", candidate);
        };

        let room = Room::new(room_id.clone(), creator, Utc::now());
        let view = room.to_view();
        state.rooms.insert(room_id, room);
        view
    }

    async fn update_room<T>(
        &self,
        room_id: &RoomId,
        update: impl FnOnce(&mut Room) -> Result<T, GameError>,
    ) -> Result<(T, RoomView), GameError> {
        let mut state = self.state.lock().await;
        let room = state.rooms.get_mut(room_id).ok_or(GameError::RoomNotFound)?;
        let value = update(room)?;
        room.touch(Utc::now());
        Ok((value, room.to_view()))
    }

    pub async fn join_room(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<JoinResult, GameError> {
        let ((player, rejoined), room) = self.update_room(room_id, |room| room.join(player_id)).await?;
        Ok(JoinResult { room, player, rejoined })
    }

    pub async fn make_move(&self, room_id: &RoomId, player_id: &PlayerId, position: usize) -> Result<RoomView, GameError> {
        let ((), room) = self
            .update_room(room_id, |room| room.make_move(player_id, position))
            .await?;
        Ok(room)
    }

    pub async fn reset_game(&self, room_id: &RoomId) -> Result<RoomView, GameError> {
        let ((), room) = self
            .update_room(room_id, |room| {
                room.reset();
                Ok(())
            })
            .await?;
        Ok(room)
    }

    pub async fn mark_disconnected(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<(Player, RoomView), GameError> {
        self.update_room(room_id, |room| room.mark_disconnected(player_id)).await
    }

    /// Marks the player disconnected in every room where they hold a seat.
    pub async fn disconnect_everywhere(&self, player_id: &PlayerId) -> Vec<(Player, RoomView)> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        state
            .rooms
            .values_mut()
            .filter_map(|room| {
                let player = room.mark_disconnected(player_id).ok()?;
                room.touch(now);
                Some((player, room.to_view()))
            })
            .collect()
    }

    pub async fn get_room(&self, room_id: &RoomId) -> Result<RoomView, GameError> {
        let state = self.state.lock().await;
        state
            .rooms
            .get(room_id)
            .map(Room::to_view)
            .ok_or(GameError::RoomNotFound)
    }

    /// Snapshot of the room only if it changed after `watermark` (Unix ms).
    pub async fn room_state_since(&self, room_id: &RoomId, watermark: i64) -> Result<Option<RoomView>, GameError> {
        let state = self.state.lock().await;
        let room = state.rooms.get(room_id).ok_or(GameError::RoomNotFound)?;
        if room.last_activity.timestamp_millis() > watermark {
            Ok(Some(room.to_view()))
        } else {
            Ok(None)
        }
    }

    pub async fn list_active_rooms(&self) -> Vec<RoomSummary> {
        let state = self.state.lock().await;
        let mut rooms: Vec<RoomSummary> = state.rooms.values().map(Room::to_summary).collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        rooms
    }

    pub async fn room_count(&self) -> usize {
        self.state.lock().await.rooms.len()
    }

    /// Removes every room the retention policy considers expired and returns their last state.
    pub async fn evict_expired(&self, now: DateTime<Utc>) -> Vec<RoomView> {
        let mut state = self.state.lock().await;

        let expired: Vec<RoomId> = state
            .rooms
            .values()
            .filter(|room| self.retention.is_expired(room, now))
            .map(|room| room.id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|room_id| state.rooms.remove(room_id))
            .map(|room| room.to_view())
            .collect()
    }

    #[cfg(test)]
    async fn insert_room(&self, room: Room) {
        self.state.lock().await.rooms.insert(room.id.clone(), room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use chrono::TimeDelta;
    use common::games::tictactoe::GameStatus;
    use crate::retention::IdleTimeout;

    fn pid(id: &str) -> PlayerId {
        PlayerId::from(id)
    }

    async fn room_with_two_players(store: &RoomStore) -> RoomId {
        let room = store.create_room(pid("alice")).await;
        store.join_room(&room.id, &pid("bob")).await.unwrap();
        room.id
    }

    #[tokio::test]
    async fn test_create_room_seeds_creator_as_x() {
        let store = RoomStore::default();

        let room = store.create_room(pid("alice")).await;

        assert_eq!(room.id.as_str().len(), 6);
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.players[0].symbol, Mark::X);
        assert!(room.players[0].connected);
        assert_eq!(room.game_state, GameState::new());
        assert_eq!(store.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_room_retries_on_id_collision() {
        let seed = 42;
        let mut preview = SessionRng::new(seed);
        let first_id = generate_room_id(&mut preview);
        let second_id = generate_room_id(&mut preview);

        let store = RoomStore::with_rng(Arc::new(KeepForever), SessionRng::new(seed));
        store.insert_room(Room::new(first_id.clone(), pid("squatter"), Utc::now())).await;

        let room = store.create_room(pid("alice")).await;

        assert_ne!(room.id, first_id);
        assert_eq!(room.id, second_id);
        assert_eq!(store.get_room(&first_id).await.unwrap().players[0].id, pid("squatter"));
    }

    #[tokio::test]
    async fn test_join_assigns_o_to_second_player() {
        let store = RoomStore::default();
        let room = store.create_room(pid("alice")).await;

        let joined = store.join_room(&room.id, &pid("bob")).await.unwrap();

        assert!(!joined.rejoined);
        assert_eq!(joined.player.symbol, Mark::O);
        assert_eq!(joined.room.players.len(), 2);
    }

    #[tokio::test]
    async fn test_join_unknown_room() {
        let store = RoomStore::default();
        let missing = RoomId::parse("ZZZZZZ").unwrap();

        let result = store.join_room(&missing, &pid("bob")).await;

        assert!(matches!(result, Err(GameError::RoomNotFound)));
    }

    #[tokio::test]
    async fn test_third_player_gets_room_full() {
        let store = RoomStore::default();
        let room_id = room_with_two_players(&store).await;

        let result = store.join_room(&room_id, &pid("carol")).await;

        assert!(matches!(result, Err(GameError::RoomFull)));
        assert_eq!(store.get_room(&room_id).await.unwrap().players.len(), 2);
    }

    #[tokio::test]
    async fn test_rejoin_only_flips_connected() {
        let store = RoomStore::default();
        let room_id = room_with_two_players(&store).await;
        store.mark_disconnected(&room_id, &pid("bob")).await.unwrap();
        let before = store.get_room(&room_id).await.unwrap();

        let rejoined = store.join_room(&room_id, &pid("bob")).await.unwrap();

        assert!(rejoined.rejoined);
        assert_eq!(rejoined.player.symbol, Mark::O);
        assert!(rejoined.room.players[1].connected);
        assert_eq!(rejoined.room.players.len(), 2);
        assert_eq!(rejoined.room.game_state, before.game_state);
    }

    #[tokio::test]
    async fn test_top_row_win_then_game_already_finished() {
        let store = RoomStore::default();
        let room_id = room_with_two_players(&store).await;

        let mut last = None;
        for (player, position) in [("alice", 0), ("bob", 3), ("alice", 1), ("bob", 4), ("alice", 2)] {
            last = Some(store.make_move(&room_id, &pid(player), position).await.unwrap());
        }
        let room = last.unwrap();

        assert_eq!(room.game_state.winner, Some(Mark::X));
        assert_eq!(room.game_state.winning_line.map(|line| line.pattern), Some([0, 1, 2]));

        let after = store.make_move(&room_id, &pid("bob"), 8).await;
        assert!(matches!(after, Err(GameError::GameAlreadyFinished)));
    }

    #[tokio::test]
    async fn test_illegal_move_is_idempotent() {
        let store = RoomStore::default();
        let room_id = room_with_two_players(&store).await;
        store.make_move(&room_id, &pid("alice"), 4).await.unwrap();
        let before = store.get_room(&room_id).await.unwrap();

        let first = store.make_move(&room_id, &pid("bob"), 4).await;
        let second = store.make_move(&room_id, &pid("bob"), 4).await;

        assert!(matches!(first, Err(GameError::PositionOccupied)));
        assert!(matches!(second, Err(GameError::PositionOccupied)));
        let after = store.get_room(&room_id).await.unwrap();
        assert_eq!(after.game_state, before.game_state);
        assert_eq!(after.last_activity, before.last_activity);
    }

    #[tokio::test]
    async fn test_move_out_of_turn_and_by_stranger() {
        let store = RoomStore::default();
        let room_id = room_with_two_players(&store).await;

        let wrong_turn = store.make_move(&room_id, &pid("bob"), 0).await;
        let stranger = store.make_move(&room_id, &pid("mallory"), 0).await;

        assert!(matches!(wrong_turn, Err(GameError::NotYourTurn)));
        assert!(matches!(stranger, Err(GameError::PlayerNotInRoom)));
    }

    #[tokio::test]
    async fn test_draw_game() {
        let store = RoomStore::default();
        let room_id = room_with_two_players(&store).await;

        let moves = [0, 1, 2, 4, 3, 5, 7, 6, 8];
        let mut room = None;
        for (turn, position) in moves.into_iter().enumerate() {
            let player = if turn % 2 == 0 { "alice" } else { "bob" };
            room = Some(store.make_move(&room_id, &pid(player), position).await.unwrap());
        }
        let room = room.unwrap();

        assert!(room.game_state.is_draw);
        assert_eq!(room.game_state.winner, None);
        assert_eq!(room.game_state.status(), GameStatus::Draw);
    }

    #[tokio::test]
    async fn test_reset_keeps_players() {
        let store = RoomStore::default();
        let room_id = room_with_two_players(&store).await;
        store.make_move(&room_id, &pid("alice"), 0).await.unwrap();
        store.make_move(&room_id, &pid("bob"), 4).await.unwrap();
        let players_before = store.get_room(&room_id).await.unwrap().players;

        let room = store.reset_game(&room_id).await.unwrap();

        assert_eq!(room.game_state, GameState::new());
        assert_eq!(room.game_state.current_player, Mark::X);
        assert_eq!(room.game_state.move_count, 0);
        assert_eq!(room.players, players_before);
    }

    #[tokio::test]
    async fn test_reset_unknown_room() {
        let store = RoomStore::default();

        let result = store.reset_game(&RoomId::parse("ABCDEF").unwrap()).await;

        assert!(matches!(result, Err(GameError::RoomNotFound)));
    }

    #[tokio::test]
    async fn test_mark_disconnected_keeps_seat() {
        let store = RoomStore::default();
        let room_id = room_with_two_players(&store).await;

        let (player, room) = store.mark_disconnected(&room_id, &pid("alice")).await.unwrap();

        assert!(!player.connected);
        assert_eq!(player.symbol, Mark::X);
        assert_eq!(room.players.len(), 2);
        assert!(matches!(
            store.mark_disconnected(&room_id, &pid("nobody")).await,
            Err(GameError::PlayerNotInRoom)
        ));
    }

    #[tokio::test]
    async fn test_disconnect_everywhere_touches_only_seated_rooms() {
        let store = RoomStore::default();
        let shared = room_with_two_players(&store).await;
        let other = store.create_room(pid("carol")).await;

        let affected = store.disconnect_everywhere(&pid("bob")).await;

        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].1.id, shared);
        assert!(!affected[0].0.connected);
        assert!(store.get_room(&other.id).await.unwrap().players[0].connected);
    }

    #[tokio::test]
    async fn test_room_state_since_watermark() {
        let store = RoomStore::default();
        let room = store.create_room(pid("alice")).await;

        let unchanged = store.room_state_since(&room.id, room.last_activity).await.unwrap();
        assert!(unchanged.is_none());

        store.join_room(&room.id, &pid("bob")).await.unwrap();

        let changed = store.room_state_since(&room.id, room.last_activity).await.unwrap().unwrap();
        assert!(changed.last_activity > room.last_activity);
        assert_eq!(changed.players.len(), 2);
    }

    #[tokio::test]
    async fn test_every_mutation_advances_last_activity() {
        let store = RoomStore::default();
        let room = store.create_room(pid("alice")).await;
        let joined = store.join_room(&room.id, &pid("bob")).await.unwrap().room;
        let moved = store.make_move(&room.id, &pid("alice"), 4).await.unwrap();
        let reset = store.reset_game(&room.id).await.unwrap();

        assert!(joined.last_activity > room.last_activity);
        assert!(moved.last_activity > joined.last_activity);
        assert!(reset.last_activity > moved.last_activity);
    }

    #[tokio::test]
    async fn test_list_active_rooms() {
        let store = RoomStore::default();
        let full = room_with_two_players(&store).await;
        let waiting = store.create_room(pid("carol")).await.id;

        let rooms = store.list_active_rooms().await;

        assert_eq!(rooms.len(), 2);
        let full_summary = rooms.iter().find(|r| r.id == full).unwrap();
        let waiting_summary = rooms.iter().find(|r| r.id == waiting).unwrap();
        assert!(full_summary.game_started);
        assert_eq!(full_summary.player_count, 2);
        assert!(!waiting_summary.game_started);
        assert_eq!(waiting_summary.player_count, 1);
    }

    #[tokio::test]
    async fn test_evict_expired_uses_policy() {
        let store = RoomStore::new(Arc::new(IdleTimeout::new(Duration::from_secs(3600))));
        let room = store.create_room(pid("alice")).await;

        assert!(store.evict_expired(Utc::now()).await.is_empty());

        let evicted = store.evict_expired(Utc::now() + TimeDelta::hours(2)).await;

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, room.id);
        assert!(matches!(store.get_room(&room.id).await, Err(GameError::RoomNotFound)));
    }

    #[tokio::test]
    async fn test_keep_forever_never_evicts() {
        let store = RoomStore::default();
        store.create_room(pid("alice")).await;

        let evicted = store.evict_expired(Utc::now() + TimeDelta::days(30)).await;

        assert!(evicted.is_empty());
        assert_eq!(store.room_count().await, 1);
    }

    #[test]
    fn test_room_phases() {
        let mut room = Room::new(RoomId::parse("PHASE1").unwrap(), pid("alice"), Utc::now());
        assert_eq!(room.phase(), RoomPhase::WaitingForSecondPlayer);

        room.join(&pid("bob")).unwrap();
        assert_eq!(room.phase(), RoomPhase::InProgress);

        for (player, position) in [("alice", 0), ("bob", 3), ("alice", 1), ("bob", 4), ("alice", 2)] {
            room.make_move(&pid(player), position).unwrap();
        }
        assert_eq!(room.phase(), RoomPhase::Finished);

        room.reset();
        assert_eq!(room.phase(), RoomPhase::InProgress);

        room.players.clear();
        assert_eq!(room.phase(), RoomPhase::Empty);
    }
}
