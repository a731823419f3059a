//! Room directory: creates rooms, generates join codes, and routes
//! players to their room.

use std::collections::HashMap;
use std::sync::Arc;

use pinpoint_protocol::{GameSettings, PlayerId, RoomCode};
use rand::Rng;

use crate::challenge::ChallengeProvider;
use crate::room::{spawn_room, PlayerSender, RoomHandle, RoomInfo};
use crate::store::GameStore;
use crate::RoomError;

/// Join-code alphabet. Skips 0/O and 1/I so codes survive being read
/// aloud or scribbled on a napkin.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Join-code length. 32^6 ≈ a billion codes.
const CODE_LEN: usize = 6;

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// All active rooms, and which player is in which.
///
/// This is the entry point for room operations from the connection layer.
/// Like the actors behind it, the directory enforces the one-room-at-a-time
/// invariant: `player_rooms` maps each player to at most one code.
pub struct RoomDirectory<S, P> {
    rooms: HashMap<RoomCode, RoomHandle>,
    player_rooms: HashMap<PlayerId, RoomCode>,
    store: Arc<S>,
    challenges: Arc<P>,
}

impl<S: GameStore, P: ChallengeProvider> RoomDirectory<S, P> {
    pub fn new(store: Arc<S>, challenges: Arc<P>) -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            store,
            challenges,
        }
    }

    /// Creates a room with a fresh join code and seats the creator as
    /// host. Returns the code.
    pub async fn create_room(
        &mut self,
        host: PlayerId,
        settings: GameSettings,
        sender: PlayerSender,
    ) -> Result<RoomCode, RoomError> {
        if let Some(current) = self.player_rooms.get(&host) {
            return Err(RoomError::AlreadyInRoom(host, current.clone()));
        }

        let code = self.fresh_code();
        let handle = spawn_room(
            code.clone(),
            host,
            settings,
            Arc::clone(&self.store),
            Arc::clone(&self.challenges),
            DEFAULT_CHANNEL_SIZE,
        );
        handle.join(host, sender).await?;

        self.rooms.insert(code.clone(), handle);
        self.player_rooms.insert(host, code.clone());
        tracing::info!(room = %code, %host, "room created");
        Ok(code)
    }

    /// Adds a player to an existing room.
    pub async fn join_room(
        &mut self,
        player_id: PlayerId,
        code: &RoomCode,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        if let Some(current) = self.player_rooms.get(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, current.clone()));
        }
        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        handle.join(player_id, sender).await?;
        self.player_rooms.insert(player_id, code.clone());
        Ok(())
    }

    /// Re-attaches a reconnecting player to the room their session
    /// remembers.
    pub async fn resume(
        &mut self,
        player_id: PlayerId,
        code: &RoomCode,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        handle.resume(player_id, sender).await?;
        self.player_rooms.insert(player_id, code.clone());
        Ok(())
    }

    /// Removes a player from their room. Destroys the room if they were
    /// the last member. Returns the code they left.
    pub async fn leave_room(&mut self, player_id: PlayerId) -> Result<RoomCode, RoomError> {
        let code = self
            .player_rooms
            .get(&player_id)
            .cloned()
            .ok_or(RoomError::NotInRoom(player_id))?;

        let remaining = match self.rooms.get(&code) {
            Some(handle) => handle.leave(player_id).await?,
            None => 0,
        };
        self.player_rooms.remove(&player_id);

        if remaining == 0 {
            self.rooms.remove(&code);
            tracing::info!(room = %code, "room emptied and removed");
        }
        Ok(code)
    }

    /// Marks a player's connection as dropped without unseating them
    /// (session grace period).
    pub async fn detach(&self, player_id: PlayerId) -> Result<(), RoomError> {
        let code = self
            .player_rooms
            .get(&player_id)
            .ok_or(RoomError::NotInRoom(player_id))?;
        match self.rooms.get(code) {
            Some(handle) => handle.detach(player_id).await,
            None => Err(RoomError::NotFound(code.clone())),
        }
    }

    pub async fn set_ready(&self, player_id: PlayerId, ready: bool) -> Result<(), RoomError> {
        self.handle_for(&player_id)?.set_ready(player_id, ready).await
    }

    pub async fn start_game(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.handle_for(&player_id)?.start_game(player_id).await
    }

    pub async fn submit_guess(
        &self,
        player_id: PlayerId,
        round_index: u32,
        lat: f64,
        lng: f64,
    ) -> Result<(), RoomError> {
        self.handle_for(&player_id)?
            .submit_guess(player_id, round_index, lat, lng)
            .await
    }

    pub async fn current_round(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.handle_for(&player_id)?.current_round(player_id).await
    }

    pub async fn advance(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.handle_for(&player_id)?.advance(player_id).await
    }

    /// Metadata for one room.
    pub async fn room_info(&self, code: &RoomCode) -> Result<RoomInfo, RoomError> {
        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.info().await
    }

    /// Shuts a room down and unseats all of its players.
    pub async fn destroy_room(&mut self, code: &RoomCode) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let _ = handle.shutdown().await;
        self.player_rooms.retain(|_, c| c != code);
        tracing::info!(room = %code, "room destroyed");
        Ok(())
    }

    /// Clones the handle for the player's room. Lets a caller that keeps
    /// the directory behind a lock await actor replies without holding
    /// it — starting a round can block on the challenge provider.
    pub fn player_handle(&self, player_id: &PlayerId) -> Result<RoomHandle, RoomError> {
        self.handle_for(player_id).cloned()
    }

    /// The room a player is currently in, if any.
    pub fn player_room(&self, player_id: &PlayerId) -> Option<&RoomCode> {
        self.player_rooms.get(player_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn handle_for(&self, player_id: &PlayerId) -> Result<&RoomHandle, RoomError> {
        let code = self
            .player_rooms
            .get(player_id)
            .ok_or(RoomError::NotInRoom(*player_id))?;
        self.rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Generates a code not currently in use. Collisions are vanishingly
    /// rare at realistic room counts, so retrying is cheaper than
    /// bookkeeping.
    fn fresh_code(&self) -> RoomCode {
        loop {
            let code = generate_code();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

fn generate_code() -> RoomCode {
    let mut rng = rand::rng();
    let code: String = (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    RoomCode::new(&code)
}
