use std::time::Duration;
use chrono::{DateTime, Utc};
use common::log;
use common::protocol::{RoomClosed, ServerMessage};

use crate::broadcaster::Broadcaster;
use crate::room_store::RoomStore;

const ROOM_INACTIVE_REASON: &str = "Room inactive for too long";

pub struct CleanupTask {
    rooms: RoomStore,
    broadcaster: Broadcaster,
    check_interval: Duration,
}

impl CleanupTask {
    pub fn new(rooms: RoomStore, broadcaster: Broadcaster, check_interval: Duration) -> Self {
        Self {
            rooms,
            broadcaster,
            check_interval,
        }
    }

    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.check_interval);

        loop {
            interval.tick().await;
            self.cleanup_expired_rooms(Utc::now()).await;
        }
    }

    /// Evicts every expired room and tells its connected occupants. Returns how many rooms were closed.
    pub async fn cleanup_expired_rooms(&self, now: DateTime<Utc>) -> usize {
        let evicted = self.rooms.evict_expired(now).await;

        for room in &evicted {
            log!("Cleaning up inactive room: {} ({})", room.id, self.rooms.retention_description());

            let closed = ServerMessage::RoomClosed {
                data: RoomClosed {
                    room_id: room.id.to_string(),
                    reason: ROOM_INACTIVE_REASON.to_string(),
                },
            };

            self.broadcaster.broadcast_to_room(room, closed, None).await;
        }

        if !evicted.is_empty() {
            log!("Closed {} inactive room(s), {} still open", evicted.len(), self.rooms.room_count().await);
        }

        evicted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tokio::sync::mpsc;
    use common::PlayerId;

    use crate::retention::policy_for_timeout;

    #[tokio::test]
    async fn test_idle_rooms_are_closed_and_occupants_notified() {
        let rooms = RoomStore::new(policy_for_timeout(Some(Duration::from_secs(60))));
        let broadcaster = Broadcaster::new();
        let (tx, mut rx) = mpsc::channel(4);
        broadcaster.register(PlayerId::from("alice"), tx).await;
        let room = rooms.create_room(PlayerId::from("alice")).await;
        let task = CleanupTask::new(rooms.clone(), broadcaster, Duration::from_secs(1));

        let closed = task.cleanup_expired_rooms(Utc::now() + TimeDelta::minutes(5)).await;

        assert_eq!(closed, 1);
        assert_eq!(rooms.room_count().await, 0);
        match rx.recv().await {
            Some(ServerMessage::RoomClosed { data }) => {
                assert_eq!(data.room_id, room.id.to_string());
                assert_eq!(data.reason, ROOM_INACTIVE_REASON);
            }
            other => panic!("expected ROOM_CLOSED, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fresh_rooms_survive_cleanup() {
        let rooms = RoomStore::new(policy_for_timeout(Some(Duration::from_secs(60))));
        rooms.create_room(PlayerId::from("alice")).await;
        let task = CleanupTask::new(rooms.clone(), Broadcaster::new(), Duration::from_secs(1));

        let closed = task.cleanup_expired_rooms(Utc::now()).await;

        assert_eq!(closed, 0);
        assert_eq!(rooms.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_keep_forever_never_closes_rooms() {
        let rooms = RoomStore::new(policy_for_timeout(None));
        rooms.create_room(PlayerId::from("alice")).await;
        let task = CleanupTask::new(rooms.clone(), Broadcaster::new(), Duration::from_secs(1));

        let closed = task.cleanup_expired_rooms(Utc::now() + TimeDelta::days(365)).await;

        assert_eq!(closed, 0);
        assert_eq!(rooms.room_count().await, 1);
    }
}
