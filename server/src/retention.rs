use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};

use crate::room_store::Room;

/// Decides when a room has outlived its usefulness and may be evicted.
pub trait RetentionPolicy: Send + Sync {
    fn is_expired(&self, room: &Room, now: DateTime<Utc>) -> bool;
    fn describe(&self) -> String;
}

/// Rooms live as long as the process.
pub struct KeepForever;

impl RetentionPolicy for KeepForever {
    fn is_expired(&self, _room: &Room, _now: DateTime<Utc>) -> bool {
        false
    }

    fn describe(&self) -> String {
        "rooms are kept until shutdown".to_string()
    }
}

pub struct IdleTimeout {
    timeout: Duration,
}

impl IdleTimeout {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl RetentionPolicy for IdleTimeout {
    fn is_expired(&self, room: &Room, now: DateTime<Utc>) -> bool {
        (now - room.last_activity)
            .to_std()
            .map(|idle| idle >= self.timeout)
            .unwrap_or(false)
    }

    fn describe(&self) -> String {
        format!("rooms idle for {}s are closed", self.timeout.as_secs())
    }
}

pub fn policy_for_timeout(timeout: Option<Duration>) -> Arc<dyn RetentionPolicy> {
    match timeout {
        Some(timeout) => Arc::new(IdleTimeout::new(timeout)),
        None => Arc::new(KeepForever),
    }
}
