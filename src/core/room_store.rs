use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{
    normalize_code, validate_player_name, BroadcastHub, CodeGenerator, LeaveOutcome, Phase,
    Player, RandomCodeGenerator, Room, RoomSnapshot, Team, ALLOWED_TEAM_SIZES,
    COMPLETED_ROOM_GRACE_SECONDS, DEFAULT_TEAM_SIZE, IDLE_ROOM_TIMEOUT_SECONDS,
    MAX_CODE_ATTEMPTS, MIN_PLAYERS,
};
use crate::error::{GameError, GameResult};

/// Room policy knobs
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Players needed to start
    pub min_players: usize,
    /// Seats per team when the creator does not choose
    pub default_team_size: usize,
    /// Code draws before `CapacityExhausted`
    pub max_code_attempts: usize,
    /// Rooms with no subscribers and no mutation for this long are swept
    pub idle_timeout: Duration,
    /// How long a completed room stays around
    pub completed_grace: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            min_players: MIN_PLAYERS,
            default_team_size: DEFAULT_TEAM_SIZE,
            max_code_attempts: MAX_CODE_ATTEMPTS,
            idle_timeout: Duration::from_secs(IDLE_ROOM_TIMEOUT_SECONDS),
            completed_grace: Duration::from_secs(COMPLETED_ROOM_GRACE_SECONDS),
        }
    }
}

/// Result of creating a room
#[derive(Debug, Clone)]
pub struct CreatedRoom {
    pub code: String,
    pub host: Player,
    pub snapshot: Arc<RoomSnapshot>,
}

/// Registry-wide counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_rooms: usize,
    pub active_rooms: usize,
    pub total_players: usize,
    pub subscribers: usize,
}

/// Why the sweeper removed a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    Empty,
    CompletedGraceElapsed,
    Idle,
}

type SharedRoom = Arc<RwLock<Room>>;

/// In-memory registry of all active rooms
///
/// The code map has its own lock, held only to look up, insert or remove
/// entries. Each room sits behind its own lock, so work on one room never
/// waits on another. Every successful mutation publishes the new snapshot
/// to the hub before the room lock is released.
pub struct RoomStore {
    rooms: RwLock<HashMap<String, SharedRoom>>,
    hub: Arc<BroadcastHub>,
    codes: Box<dyn CodeGenerator>,
    config: StoreConfig,
}

impl RoomStore {
    /// Create a store with the default random code generator
    pub fn new(config: StoreConfig, hub: Arc<BroadcastHub>) -> Self {
        Self::with_code_generator(config, hub, Box::new(RandomCodeGenerator))
    }

    pub fn with_code_generator(
        config: StoreConfig,
        hub: Arc<BroadcastHub>,
        codes: Box<dyn CodeGenerator>,
    ) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            hub,
            codes,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    async fn lookup(&self, code: &str) -> GameResult<(String, SharedRoom)> {
        let code = normalize_code(code);
        let room = self
            .rooms
            .read()
            .await
            .get(&code)
            .cloned()
            .ok_or_else(|| GameError::RoomNotFound(code.clone()))?;
        Ok((code, room))
    }

    /// Apply `f` to a room under its write lock and publish the result
    ///
    /// The registry lock is released before the room lock is taken.
    async fn mutate<T>(
        &self,
        code: &str,
        f: impl FnOnce(&mut Room) -> GameResult<T>,
    ) -> GameResult<(T, Arc<RoomSnapshot>)> {
        let (code, room) = self.lookup(code).await?;
        let mut room = room.write().await;

        // the sweeper may have dropped the room between lookup and lock
        if room.closed {
            return Err(GameError::RoomNotFound(code));
        }

        let value = f(&mut *room)?;
        let snapshot = self.commit(&mut *room)?;
        Ok((value, snapshot))
    }

    fn commit(&self, room: &mut Room) -> GameResult<Arc<RoomSnapshot>> {
        room.touch();
        room.check_invariants()?;
        let snapshot = Arc::new(room.snapshot());
        self.hub.publish(&room.code, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Create a lobby with `host_name` as host and first player
    ///
    /// # Errors
    ///
    /// - `Validation` for a bad name or unsupported team size
    /// - `CapacityExhausted` if no free code was drawn within the attempt budget
    pub async fn create_room(
        &self,
        host_name: &str,
        team_size: Option<usize>,
    ) -> GameResult<CreatedRoom> {
        let name = validate_player_name(host_name)?;
        let team_size = team_size.unwrap_or(self.config.default_team_size);
        if !ALLOWED_TEAM_SIZES.contains(&team_size) {
            return Err(GameError::Validation(format!(
                "Team size must be one of {:?}",
                ALLOWED_TEAM_SIZES
            )));
        }

        let host = Player::new(name);

        // Held across the draw so two creates cannot claim the same code
        let mut rooms = self.rooms.write().await;

        let code = (0..self.config.max_code_attempts)
            .map(|_| normalize_code(&self.codes.generate()))
            .find(|candidate| !rooms.contains_key(candidate))
            .ok_or(GameError::CapacityExhausted {
                attempts: self.config.max_code_attempts,
            })?;

        let mut room = Room::new(code.clone(), host, team_size, self.config.min_players);
        let host = room.players[0].clone();
        room.touch();
        room.check_invariants()?;
        let snapshot = Arc::new(room.snapshot());

        rooms.insert(code.clone(), Arc::new(RwLock::new(room)));
        drop(rooms);

        tracing::info!(game_id = %code, host_id = %host.id, team_size, "room created");

        Ok(CreatedRoom {
            code,
            host,
            snapshot,
        })
    }

    /// Seat a new player in a lobby
    pub async fn join_room(
        &self,
        code: &str,
        player_name: &str,
    ) -> GameResult<(Player, Arc<RoomSnapshot>)> {
        let name = validate_player_name(player_name)?;
        let (player, snapshot) = self
            .mutate(code, |room| room.join(Player::new(name)))
            .await?;

        tracing::info!(
            game_id = %snapshot.game_id,
            player_id = %player.id,
            team = ?player.team,
            players = snapshot.players.len(),
            "player joined"
        );
        Ok((player, snapshot))
    }

    /// Consistent snapshot of a room
    pub async fn get_room(&self, code: &str) -> GameResult<Arc<RoomSnapshot>> {
        let (code, room) = self.lookup(code).await?;
        let room = room.read().await;
        if room.closed {
            return Err(GameError::RoomNotFound(code));
        }
        Ok(Arc::new(room.snapshot()))
    }

    /// Whether `player_id` holds a seat in the room
    pub async fn has_player(&self, code: &str, player_id: &str) -> GameResult<bool> {
        let (_, room) = self.lookup(code).await?;
        let room = room.read().await;
        Ok(!room.closed && room.player(player_id).is_some())
    }

    pub async fn start_game(&self, code: &str, player_id: &str) -> GameResult<Arc<RoomSnapshot>> {
        let ((), snapshot) = self.mutate(code, |room| room.start(player_id)).await?;
        tracing::info!(
            game_id = %snapshot.game_id,
            players = snapshot.players.len(),
            "game started"
        );
        Ok(snapshot)
    }

    pub async fn end_game(&self, code: &str, player_id: &str) -> GameResult<Arc<RoomSnapshot>> {
        let ((), snapshot) = self.mutate(code, |room| room.end(player_id)).await?;
        tracing::info!(game_id = %snapshot.game_id, "game completed");
        Ok(snapshot)
    }

    pub async fn switch_team(
        &self,
        code: &str,
        player_id: &str,
        team: Team,
    ) -> GameResult<Arc<RoomSnapshot>> {
        let ((), snapshot) = self
            .mutate(code, |room| room.switch_team(player_id, team))
            .await?;
        tracing::debug!(game_id = %snapshot.game_id, %player_id, %team, "player switched team");
        Ok(snapshot)
    }

    pub async fn reconnect_player(
        &self,
        code: &str,
        player_id: &str,
    ) -> GameResult<Arc<RoomSnapshot>> {
        let ((), snapshot) = self.mutate(code, |room| room.reconnect(player_id)).await?;
        tracing::debug!(game_id = %snapshot.game_id, %player_id, "player reconnected");
        Ok(snapshot)
    }

    /// Take a player out of a room
    ///
    /// Returns `None` when the departure emptied the room, which is then
    /// removed from the registry.
    pub async fn leave_room(
        &self,
        code: &str,
        player_id: &str,
    ) -> GameResult<Option<Arc<RoomSnapshot>>> {
        let (code, shared) = self.lookup(code).await?;
        let mut room = shared.write().await;
        if room.closed {
            return Err(GameError::RoomNotFound(code));
        }

        let outcome = room.leave(player_id)?;
        tracing::info!(game_id = %code, %player_id, ?outcome, "player left");

        if room.is_empty() {
            room.closed = true;
            drop(room);
            self.unregister(&code, &shared).await;
            tracing::info!(game_id = %code, "room removed: last player left");
            return Ok(None);
        }

        if let LeaveOutcome::Removed {
            new_host: Some(host),
        } = &outcome
        {
            tracing::info!(game_id = %code, new_host = %host, "host reassigned");
        }

        self.commit(&mut *room).map(Some)
    }

    /// Drop a room's registry entry if it still points at `shared`, and
    /// release its subscribers
    async fn unregister(&self, code: &str, shared: &SharedRoom) {
        let mut rooms = self.rooms.write().await;
        if rooms.get(code).is_some_and(|current| Arc::ptr_eq(current, shared)) {
            rooms.remove(code);
        }
        drop(rooms);
        self.hub.close_room(code);
    }

    /// Explicit teardown; absent rooms are a no-op
    pub async fn remove_room(&self, code: &str) -> bool {
        let code = normalize_code(code);
        let removed = self.rooms.write().await.remove(&code);

        match removed {
            Some(room) => {
                room.write().await.closed = true;
                self.hub.close_room(&code);
                tracing::info!(game_id = %code, "room removed");
                true
            }
            None => false,
        }
    }

    fn expiry(&self, room: &Room, now: OffsetDateTime) -> Option<Expiry> {
        if room.is_empty() {
            return Some(Expiry::Empty);
        }

        if room.phase == Phase::Completed {
            if let Some(completed_at) = room.completed_at {
                if now - completed_at >= self.config.completed_grace {
                    return Some(Expiry::CompletedGraceElapsed);
                }
            }
        }

        if self.hub.subscriber_count(&room.code) == 0
            && now - room.last_activity >= self.config.idle_timeout
        {
            return Some(Expiry::Idle);
        }

        None
    }

    /// Remove expired rooms
    ///
    /// Each candidate is re-checked under its own write lock, so a room that
    /// saw a mutation after the scan survives.
    ///
    /// # Returns
    ///
    /// Number of rooms removed
    pub async fn sweep(&self, now: OffsetDateTime) -> usize {
        let candidates: Vec<(String, SharedRoom)> = {
            let rooms = self.rooms.read().await;
            rooms
                .iter()
                .map(|(code, room)| (code.clone(), Arc::clone(room)))
                .collect()
        };

        let mut removed = 0;
        for (code, shared) in candidates {
            let mut room = shared.write().await;
            if room.closed {
                continue;
            }
            let Some(reason) = self.expiry(&room, now) else {
                continue;
            };

            room.closed = true;
            drop(room);
            self.unregister(&code, &shared).await;
            removed += 1;
            tracing::info!(game_id = %code, ?reason, "room expired");
        }

        removed
    }

    pub async fn stats(&self) -> StoreStats {
        let rooms: Vec<SharedRoom> = self.rooms.read().await.values().cloned().collect();

        let mut stats = StoreStats {
            total_rooms: rooms.len(),
            subscribers: self.hub.total_subscribers(),
            ..StoreStats::default()
        };
        for room in rooms {
            let room = room.read().await;
            stats.total_players += room.players.len();
            if room.phase != Phase::Completed {
                stats.active_rooms += 1;
            }
        }
        stats
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
