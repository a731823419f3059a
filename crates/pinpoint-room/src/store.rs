//! Persistence hooks: guesses, running totals, and room status.
//!
//! The store is write-behind and best-effort. The room actor spawns each
//! write as a fire-and-forget task; a failing store is logged, never
//! propagated, and never delays a round. Gameplay continues from the
//! actor's in-memory state.

use std::collections::HashMap;
use std::sync::Mutex;

use pinpoint_protocol::{GameMode, LatLng, PlayerId, RoomCode, RoomStatus};
use serde::{Deserialize, Serialize};

/// Errors from a game store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One persisted guess row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuessRecord {
    pub room: RoomCode,
    pub player_id: PlayerId,
    /// 1-based round index.
    pub round_index: u32,
    pub guess: LatLng,
    pub distance_km: f64,
    pub score: u32,
    pub mode: GameMode,
}

/// Write-behind persistence for game results.
///
/// Implementations must be `Send + Sync + 'static`; one store is shared by
/// every room actor and called from spawned tasks.
pub trait GameStore: Send + Sync + 'static {
    /// Records one player's resolved guess for a round.
    fn record_guess(
        &self,
        record: GuessRecord,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Upserts a player's cumulative score in a room.
    fn update_total_score(
        &self,
        room: RoomCode,
        player_id: PlayerId,
        total: u32,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Records the room's coarse status transition.
    fn set_room_status(
        &self,
        room: RoomCode,
        status: RoomStatus,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

#[derive(Default)]
struct MemoryStoreInner {
    guesses: Vec<GuessRecord>,
    totals: HashMap<(RoomCode, PlayerId), u32>,
    statuses: HashMap<RoomCode, RoomStatus>,
}

/// In-memory store for tests and the demo server.
///
/// A `std::sync::Mutex` is fine here: every critical section is a plain
/// map operation with no `.await` inside.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded guesses for a room, in insertion order.
    pub fn guesses_for(&self, room: &RoomCode) -> Vec<GuessRecord> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .guesses
            .iter()
            .filter(|g| &g.room == room)
            .cloned()
            .collect()
    }

    pub fn total_for(&self, room: &RoomCode, player_id: PlayerId) -> Option<u32> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .totals
            .get(&(room.clone(), player_id))
            .copied()
    }

    pub fn status_of(&self, room: &RoomCode) -> Option<RoomStatus> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .statuses
            .get(room)
            .copied()
    }
}

impl GameStore for MemoryStore {
    async fn record_guess(&self, record: GuessRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .guesses
            .push(record);
        Ok(())
    }

    async fn update_total_score(
        &self,
        room: RoomCode,
        player_id: PlayerId,
        total: u32,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .totals
            .insert((room, player_id), total);
        Ok(())
    }

    async fn set_room_status(&self, room: RoomCode, status: RoomStatus) -> Result<(), StoreError> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .statuses
            .insert(room, status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(room: &str, player: u64, round: u32) -> GuessRecord {
        GuessRecord {
            room: RoomCode::new(room),
            player_id: PlayerId(player),
            round_index: round,
            guess: LatLng::new(10.0, 20.0),
            distance_km: 120.5,
            score: 941,
            mode: GameMode::Multiplayer,
        }
    }

    #[tokio::test]
    async fn test_memory_store_records_guesses_per_room() {
        let store = MemoryStore::new();

        store.record_guess(record("AAA234", 1, 1)).await.unwrap();
        store.record_guess(record("AAA234", 2, 1)).await.unwrap();
        store.record_guess(record("BBB234", 1, 1)).await.unwrap();

        let room_a = store.guesses_for(&RoomCode::new("AAA234"));
        assert_eq!(room_a.len(), 2);
        assert_eq!(room_a[0].player_id, PlayerId(1));
        assert_eq!(room_a[1].player_id, PlayerId(2));
    }

    #[tokio::test]
    async fn test_memory_store_total_score_upserts() {
        let store = MemoryStore::new();
        let room = RoomCode::new("AAA234");

        store
            .update_total_score(room.clone(), PlayerId(1), 900)
            .await
            .unwrap();
        store
            .update_total_score(room.clone(), PlayerId(1), 1750)
            .await
            .unwrap();

        assert_eq!(store.total_for(&room, PlayerId(1)), Some(1750));
        assert_eq!(store.total_for(&room, PlayerId(2)), None);
    }

    #[tokio::test]
    async fn test_memory_store_room_status_transitions() {
        let store = MemoryStore::new();
        let room = RoomCode::new("AAA234");

        assert_eq!(store.status_of(&room), None);

        store
            .set_room_status(room.clone(), RoomStatus::Active)
            .await
            .unwrap();
        assert_eq!(store.status_of(&room), Some(RoomStatus::Active));

        store
            .set_room_status(room.clone(), RoomStatus::Finished)
            .await
            .unwrap();
        assert_eq!(store.status_of(&room), Some(RoomStatus::Finished));
    }
}
