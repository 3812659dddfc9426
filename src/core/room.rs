use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use super::{Player, Team};
use crate::error::GameError;

/// Room lifecycle phase
///
/// Transitions only move forward: `Lobby -> InProgress -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    InProgress,
    Completed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Lobby => "lobby",
            Phase::InProgress => "in_progress",
            Phase::Completed => "completed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a player leaving a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Player was removed from the lobby; `new_host` is set when the host left
    Removed { new_host: Option<String> },
    /// Game is running, so the seat is kept and marked disconnected
    Disconnected,
}

/// Player counts per team
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCounts {
    pub a: usize,
    pub b: usize,
}

impl TeamCounts {
    pub fn get(&self, team: Team) -> usize {
        match team {
            Team::A => self.a,
            Team::B => self.b,
        }
    }
}

/// One player as seen by clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: String,
    pub name: String,
    pub team: Option<Team>,
    pub connected: bool,
}

/// Immutable point-in-time view of a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub game_id: String,
    pub phase: Phase,
    pub host_id: String,
    pub players: Vec<PlayerSnapshot>,
    pub team_counts: TeamCounts,
    pub team_size: usize,
    pub max_players: usize,
    pub min_players: usize,
    /// Unix timestamp (seconds)
    pub created_at: i64,
    /// Bumped on every mutation; ordering key for broadcasts
    pub version: u64,
}

/// Authoritative state of one game session
///
/// A `Room` knows nothing about locking; the store wraps each one in its own
/// lock so every method here runs with exclusive access.
#[derive(Debug)]
pub struct Room {
    /// Canonical upper case room code
    pub code: String,
    /// Current lifecycle phase
    pub phase: Phase,
    /// Players in join order
    pub players: Vec<Player>,
    /// Player allowed to start/end the game
    pub host_id: String,
    /// Seats per team
    pub team_size: usize,
    /// Players required to start
    pub min_players: usize,
    /// When the room was created
    pub created_at: OffsetDateTime,
    /// Last successful mutation
    pub last_activity: OffsetDateTime,
    /// When the game started
    pub started_at: Option<OffsetDateTime>,
    /// When the game completed
    pub completed_at: Option<OffsetDateTime>,
    /// Snapshot version, bumped by `touch`
    pub version: u64,
    /// Set once the store has dropped the room; later mutations must fail
    pub closed: bool,
}

impl Room {
    /// Create a lobby with `host` as its only player
    pub fn new(code: String, host: Player, team_size: usize, min_players: usize) -> Self {
        let now = OffsetDateTime::now_utc();
        let mut room = Self {
            code,
            phase: Phase::Lobby,
            players: Vec::new(),
            host_id: host.id.clone(),
            team_size,
            min_players,
            created_at: now,
            last_activity: now,
            started_at: None,
            completed_at: None,
            version: 0,
            closed: false,
        };
        room.seat(host);
        room
    }

    pub fn max_players(&self) -> usize {
        self.team_size * 2
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn is_host(&self, player_id: &str) -> bool {
        self.host_id == player_id
    }

    pub fn team_counts(&self) -> TeamCounts {
        self.players
            .iter()
            .fold(TeamCounts::default(), |mut counts, p| {
                match p.team {
                    Some(Team::A) => counts.a += 1,
                    Some(Team::B) => counts.b += 1,
                    None => {}
                }
                counts
            })
    }

    /// Team a newcomer is placed on: the smaller team, ties going to A
    fn pick_team(&self) -> Option<Team> {
        let counts = self.team_counts();
        [Team::A, Team::B]
            .into_iter()
            .filter(|team| counts.get(*team) < self.team_size)
            .min_by_key(|team| counts.get(*team))
    }

    fn seat(&mut self, mut player: Player) -> Player {
        player.team = self.pick_team();
        self.players.push(player.clone());
        player
    }

    /// Add a player to the lobby
    ///
    /// # Errors
    ///
    /// - `RoomNotJoinable` once the game has started
    /// - `RoomFull` when every seat is taken
    pub fn join(&mut self, player: Player) -> Result<Player, GameError> {
        if self.phase != Phase::Lobby {
            return Err(GameError::RoomNotJoinable {
                code: self.code.clone(),
                phase: self.phase,
            });
        }

        if self.players.len() >= self.max_players() {
            return Err(GameError::RoomFull(self.code.clone()));
        }

        Ok(self.seat(player))
    }

    /// Move a lobby player to the other team
    pub fn switch_team(&mut self, player_id: &str, team: Team) -> Result<(), GameError> {
        if self.phase != Phase::Lobby {
            return Err(GameError::InvalidTransition {
                from: self.phase,
                action: "switch teams in",
            });
        }

        let current = self
            .player(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?
            .team;
        if current == Some(team) {
            return Ok(());
        }

        if self.team_counts().get(team) >= self.team_size {
            return Err(GameError::TeamFull(team));
        }

        if let Some(player) = self.player_mut(player_id) {
            player.team = Some(team);
        }
        Ok(())
    }

    /// Start the game
    ///
    /// The host check comes first so a non-host gets `NotHost` in every phase.
    pub fn start(&mut self, by: &str) -> Result<(), GameError> {
        if !self.is_host(by) {
            return Err(GameError::NotHost);
        }

        if self.phase != Phase::Lobby {
            return Err(GameError::InvalidTransition {
                from: self.phase,
                action: "start",
            });
        }

        if self.players.len() < self.min_players {
            return Err(GameError::InsufficientPlayers {
                required: self.min_players,
                actual: self.players.len(),
            });
        }

        self.phase = Phase::InProgress;
        self.started_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    /// Complete a running game
    pub fn end(&mut self, by: &str) -> Result<(), GameError> {
        if !self.is_host(by) {
            return Err(GameError::NotHost);
        }

        if self.phase != Phase::InProgress {
            return Err(GameError::InvalidTransition {
                from: self.phase,
                action: "end",
            });
        }

        self.phase = Phase::Completed;
        self.completed_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    /// Remove a player from the lobby, or mark them disconnected mid-game
    pub fn leave(&mut self, player_id: &str) -> Result<LeaveOutcome, GameError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;

        if self.phase != Phase::Lobby {
            self.players[index].connected = false;
            return Ok(LeaveOutcome::Disconnected);
        }

        self.players.remove(index);

        // If host left, the earliest remaining player takes over
        let mut new_host = None;
        if self.host_id == player_id {
            if let Some(next) = self.players.first() {
                self.host_id = next.id.clone();
                new_host = Some(next.id.clone());
            }
        }

        Ok(LeaveOutcome::Removed { new_host })
    }

    /// Mark a seated player's connection as live again
    pub fn reconnect(&mut self, player_id: &str) -> Result<(), GameError> {
        let player = self
            .player_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        player.connected = true;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Record a successful mutation
    pub fn touch(&mut self) {
        self.version += 1;
        self.last_activity = OffsetDateTime::now_utc();
    }

    /// Check the structural invariants a snapshot relies on
    pub fn check_invariants(&self) -> Result<(), GameError> {
        if self.player(&self.host_id).is_none() {
            return Err(GameError::Internal(format!(
                "room {} host {} is not seated",
                self.code, self.host_id
            )));
        }

        let mut ids: Vec<&str> = self.players.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.players.len() {
            return Err(GameError::Internal(format!(
                "room {} has duplicate player ids",
                self.code
            )));
        }

        Ok(())
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            game_id: self.code.clone(),
            phase: self.phase,
            host_id: self.host_id.clone(),
            players: self
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    team: p.team,
                    connected: p.connected,
                })
                .collect(),
            team_counts: self.team_counts(),
            team_size: self.team_size,
            max_players: self.max_players(),
            min_players: self.min_players,
            created_at: self.created_at.unix_timestamp(),
            version: self.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby(team_size: usize) -> (Room, String) {
        let host = Player::new("Alice".to_string());
        let host_id = host.id.clone();
        (Room::new("K7F3QZ".to_string(), host, team_size, 2), host_id)
    }

    fn add(room: &mut Room, name: &str) -> String {
        room.join(Player::new(name.to_string())).unwrap().id
    }

    #[test]
    fn test_new_room_seats_host() {
        let (room, host_id) = lobby(4);

        assert_eq!(room.phase, Phase::Lobby);
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.host_id, host_id);
        assert_eq!(room.players[0].team, Some(Team::A));
        assert!(room.check_invariants().is_ok());
    }

    #[test]
    fn test_join_balances_teams() {
        let (mut room, _) = lobby(4);
        add(&mut room, "Bob");
        add(&mut room, "Carol");
        add(&mut room, "Dave");

        let teams: Vec<Option<Team>> = room.players.iter().map(|p| p.team).collect();
        assert_eq!(
            teams,
            vec![Some(Team::A), Some(Team::B), Some(Team::A), Some(Team::B)]
        );
        assert_eq!(room.team_counts(), TeamCounts { a: 2, b: 2 });
    }

    #[test]
    fn test_join_fills_the_other_team_when_one_is_full() {
        let (mut room, host_id) = lobby(3);
        let bob = add(&mut room, "Bob");
        room.switch_team(&bob, Team::A).unwrap();
        add(&mut room, "Carol"); // B has fewer
        add(&mut room, "Dave"); // A:2 B:1 -> B

        // A: Alice, Bob; B: Carol, Dave. Move Dave to A so A is full.
        let dave = room.players[3].id.clone();
        room.switch_team(&dave, Team::A).unwrap();
        assert_eq!(room.team_counts(), TeamCounts { a: 3, b: 1 });

        let eve = room.join(Player::new("Eve".to_string())).unwrap();
        assert_eq!(eve.team, Some(Team::B));
        assert!(room.player(&host_id).is_some());
    }

    #[test]
    fn test_join_rejects_when_full() {
        let (mut room, _) = lobby(3);
        for name in ["B", "C", "D", "E", "F"] {
            add(&mut room, name);
        }
        assert_eq!(room.players.len(), 6);

        let result = room.join(Player::new("G".to_string()));
        assert_eq!(result.unwrap_err(), GameError::RoomFull("K7F3QZ".to_string()));
    }

    #[test]
    fn test_cannot_join_started_game() {
        let (mut room, host_id) = lobby(4);
        add(&mut room, "Bob");
        room.start(&host_id).unwrap();

        let result = room.join(Player::new("Carol".to_string()));
        assert!(matches!(
            result,
            Err(GameError::RoomNotJoinable {
                phase: Phase::InProgress,
                ..
            })
        ));
    }

    #[test]
    fn test_start_requires_host() {
        let (mut room, host_id) = lobby(4);
        let bob = add(&mut room, "Bob");

        assert_eq!(room.start(&bob), Err(GameError::NotHost));
        assert!(room.start(&host_id).is_ok());
        assert_eq!(room.phase, Phase::InProgress);
        assert!(room.started_at.is_some());

        // non-host still gets NotHost after the game started
        assert_eq!(room.start(&bob), Err(GameError::NotHost));
    }

    #[test]
    fn test_start_requires_min_players() {
        let (mut room, host_id) = lobby(4);

        assert_eq!(
            room.start(&host_id),
            Err(GameError::InsufficientPlayers {
                required: 2,
                actual: 1
            })
        );
        assert_eq!(room.phase, Phase::Lobby);
    }

    #[test]
    fn test_phase_transitions_are_one_way() {
        let (mut room, host_id) = lobby(4);
        add(&mut room, "Bob");

        assert!(matches!(
            room.end(&host_id),
            Err(GameError::InvalidTransition {
                from: Phase::Lobby,
                ..
            })
        ));

        room.start(&host_id).unwrap();
        assert!(matches!(
            room.start(&host_id),
            Err(GameError::InvalidTransition {
                from: Phase::InProgress,
                ..
            })
        ));

        room.end(&host_id).unwrap();
        assert_eq!(room.phase, Phase::Completed);
        assert!(room.completed_at.is_some());

        assert!(matches!(
            room.start(&host_id),
            Err(GameError::InvalidTransition {
                from: Phase::Completed,
                ..
            })
        ));
        assert!(matches!(
            room.end(&host_id),
            Err(GameError::InvalidTransition { .. })
        ));
        assert!(matches!(
            room.join(Player::new("Late".to_string())),
            Err(GameError::RoomNotJoinable { .. })
        ));
    }

    #[test]
    fn test_leave_in_lobby_removes_and_reassigns_host() {
        let (mut room, host_id) = lobby(4);
        let bob = add(&mut room, "Bob");
        add(&mut room, "Carol");

        let outcome = room.leave(&host_id).unwrap();

        assert_eq!(
            outcome,
            LeaveOutcome::Removed {
                new_host: Some(bob.clone())
            }
        );
        assert_eq!(room.host_id, bob);
        assert_eq!(room.players.len(), 2);
        assert!(room.check_invariants().is_ok());
    }

    #[test]
    fn test_leave_in_progress_keeps_seat() {
        let (mut room, host_id) = lobby(4);
        let bob = add(&mut room, "Bob");
        room.start(&host_id).unwrap();

        assert_eq!(room.leave(&bob).unwrap(), LeaveOutcome::Disconnected);
        assert_eq!(room.players.len(), 2);
        assert!(!room.player(&bob).unwrap().connected);

        room.reconnect(&bob).unwrap();
        assert!(room.player(&bob).unwrap().connected);
    }

    #[test]
    fn test_leave_unknown_player() {
        let (mut room, _) = lobby(4);
        assert!(matches!(
            room.leave("nobody"),
            Err(GameError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn test_last_player_leaving_empties_room() {
        let (mut room, host_id) = lobby(4);
        room.leave(&host_id).unwrap();
        assert!(room.is_empty());
    }

    #[test]
    fn test_switch_team_rejects_full_team() {
        let (mut room, _) = lobby(3);
        for name in ["B", "C", "D", "E"] {
            add(&mut room, name);
        }
        // A: 3 (Alice, C, E), B: 2 (B, D)
        assert_eq!(room.team_counts(), TeamCounts { a: 3, b: 2 });
        let b_player = room.players[1].id.clone();

        assert_eq!(
            room.switch_team(&b_player, Team::A),
            Err(GameError::TeamFull(Team::A))
        );
    }

    #[test]
    fn test_switch_team_only_in_lobby() {
        let (mut room, host_id) = lobby(4);
        let bob = add(&mut room, "Bob");
        room.start(&host_id).unwrap();

        assert!(matches!(
            room.switch_team(&bob, Team::A),
            Err(GameError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let (mut room, host_id) = lobby(4);
        add(&mut room, "Bob");
        room.touch();

        let snapshot = room.snapshot();
        assert_eq!(snapshot.game_id, "K7F3QZ");
        assert_eq!(snapshot.host_id, host_id);
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.players[0].name, "Alice");
        assert_eq!(snapshot.players[1].name, "Bob");
        assert_eq!(snapshot.max_players, 8);
        assert_eq!(snapshot.version, 1);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["phase"], "lobby");
        assert_eq!(json["gameId"], "K7F3QZ");
        assert_eq!(json["teamCounts"]["a"], 1);
        assert_eq!(json["players"][1]["team"], "B");
    }

    #[test]
    fn test_phase_serialization() {
        assert_eq!(
            serde_json::to_string(&Phase::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(Phase::Completed.to_string(), "completed");
    }
}
