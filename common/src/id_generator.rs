use chrono::Utc;
use rand::Rng;

use crate::games::SessionRng;
use crate::identifiers::{PlayerId, RoomId, ROOM_ID_LENGTH};

const BASE36_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const PLAYER_SUFFIX_LENGTH: usize = 9;

fn base36_string<R: FnMut(usize) -> usize>(len: usize, mut pick: R) -> String {
    (0..len)
        .map(|_| BASE36_ALPHABET[pick(BASE36_ALPHABET.len())] as char)
        .collect()
}

pub fn generate_room_id(rng: &mut SessionRng) -> RoomId {
    RoomId::from_generated(base36_string(ROOM_ID_LENGTH, |n| rng.random_range(0..n)))
}

/// Identity for a socket client that connected without one, e.g. `player_1718000000000_k3j9x0a1b`.
pub fn generate_player_id() -> PlayerId {
    let mut rng = rand::rng();
    let suffix = base36_string(PLAYER_SUFFIX_LENGTH, |n| rng.random_range(0..n)).to_ascii_lowercase();
    PlayerId::new(format!("player_{}_{}", Utc::now().timestamp_millis(), suffix))
}
