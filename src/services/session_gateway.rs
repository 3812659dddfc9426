//! Request and connection boundary in front of the room store.
//!
//! HTTP handlers call the `*_game` methods. WebSocket sessions register a
//! connection id and hold at most one room subscription at a time through
//! [`SessionGateway::subscribe`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::auth::{issue_seat_token, verify_seat_token, AuthenticatedPlayer};
use crate::core::{
    normalize_code, RoomSnapshot, RoomStore, SubscriberId, Subscription, Team,
};
use crate::error::{GameError, GameResult};
use crate::models::{CreateGameRequest, JoinGameRequest, JoinResponse};

/// Identifies one live WebSocket connection
pub type ConnectionId = u64;

#[derive(Debug, Clone)]
struct Session {
    code: String,
    /// Seat the connection speaks for; `None` for spectators
    player_id: Option<String>,
    subscriber_id: SubscriberId,
}

/// A connection freshly attached to a room
#[derive(Debug)]
pub struct Attached {
    pub game_id: String,
    pub player_id: Option<String>,
    /// State at attach time, sent before anything from `subscription`
    pub snapshot: Arc<RoomSnapshot>,
    pub subscription: Subscription,
}

pub struct SessionGateway {
    store: Arc<RoomStore>,
    secret_key: String,
    sessions: Mutex<HashMap<ConnectionId, Session>>,
    next_connection: AtomicU64,
}

impl SessionGateway {
    pub fn new(store: Arc<RoomStore>, secret_key: impl Into<String>) -> Self {
        Self {
            store,
            secret_key: secret_key.into(),
            sessions: Mutex::new(HashMap::new()),
            next_connection: AtomicU64::new(1),
        }
    }

    pub fn store(&self) -> &Arc<RoomStore> {
        &self.store
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<ConnectionId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn seat_response(
        &self,
        game_id: &str,
        player_id: &str,
        team: Option<Team>,
    ) -> GameResult<JoinResponse> {
        let player_token =
            issue_seat_token(game_id, player_id, &self.secret_key).map_err(GameError::Internal)?;

        Ok(JoinResponse {
            game_id: game_id.to_string(),
            player_id: player_id.to_string(),
            player_token,
            team,
        })
    }

    // ---- HTTP operations ----

    pub async fn create_game(&self, request: CreateGameRequest) -> GameResult<JoinResponse> {
        let created = self
            .store
            .create_room(&request.player_name, request.team_size)
            .await?;

        self.seat_response(&created.code, &created.host.id, created.host.team)
    }

    pub async fn join_game(
        &self,
        game_id: &str,
        request: JoinGameRequest,
    ) -> GameResult<JoinResponse> {
        let (player, snapshot) = self.store.join_room(game_id, &request.player_name).await?;

        self.seat_response(&snapshot.game_id, &player.id, player.team)
    }

    pub async fn game_state(&self, game_id: &str) -> GameResult<Arc<RoomSnapshot>> {
        self.store.get_room(game_id).await
    }

    pub async fn start_game(
        &self,
        game_id: &str,
        auth: &AuthenticatedPlayer,
    ) -> GameResult<Arc<RoomSnapshot>> {
        auth.verify_game(game_id)?;
        self.store.start_game(&auth.game_id, &auth.player_id).await
    }

    pub async fn end_game(
        &self,
        game_id: &str,
        auth: &AuthenticatedPlayer,
    ) -> GameResult<Arc<RoomSnapshot>> {
        auth.verify_game(game_id)?;
        self.store.end_game(&auth.game_id, &auth.player_id).await
    }

    pub async fn leave_game(&self, game_id: &str, auth: &AuthenticatedPlayer) -> GameResult<()> {
        auth.verify_game(game_id)?;
        self.store.leave_room(&auth.game_id, &auth.player_id).await?;
        Ok(())
    }

    pub async fn switch_team(
        &self,
        game_id: &str,
        auth: &AuthenticatedPlayer,
        team: Team,
    ) -> GameResult<Arc<RoomSnapshot>> {
        auth.verify_game(game_id)?;
        self.store
            .switch_team(&auth.game_id, &auth.player_id, team)
            .await
    }

    /// Host-only teardown of a room
    pub async fn close_game(&self, game_id: &str, auth: &AuthenticatedPlayer) -> GameResult<()> {
        auth.verify_game(game_id)?;

        let snapshot = self.store.get_room(&auth.game_id).await?;
        if snapshot.host_id != auth.player_id {
            return Err(GameError::NotHost);
        }

        self.store.remove_room(&auth.game_id).await;
        Ok(())
    }

    // ---- Real-time connections ----

    /// Register a new connection
    pub fn connect(&self) -> ConnectionId {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(connection_id = id, "connection opened");
        id
    }

    /// Attach `connection` to a room, replacing whatever it was attached to
    ///
    /// With a seat token the connection speaks for that player and the seat
    /// is marked connected again. Without one it only watches.
    ///
    /// The previous subscription is released only once the new one is in
    /// place, so a failed attempt leaves the connection as it was.
    pub async fn subscribe(
        &self,
        connection: ConnectionId,
        game_id: &str,
        token: Option<&str>,
    ) -> GameResult<Attached> {
        let code = normalize_code(game_id);

        let player_id = match token {
            Some(token) => {
                let claims =
                    verify_seat_token(token, &self.secret_key).ok_or(GameError::InvalidToken)?;
                if claims.game_id != code {
                    return Err(GameError::InvalidToken);
                }
                Some(claims.player_id)
            }
            None => None,
        };

        match &player_id {
            Some(player_id) => {
                if !self.store.has_player(&code, player_id).await? {
                    return Err(GameError::PlayerNotFound(player_id.clone()));
                }
            }
            None => {
                self.store.get_room(&code).await?;
            }
        }

        // Subscribe before reading state so no update can slip in between;
        // the connection skips queued snapshots it has already seen.
        let subscription = self.store.hub().subscribe(&code);
        let snapshot = match &player_id {
            Some(player_id) => self.store.reconnect_player(&code, player_id).await,
            None => self.store.get_room(&code).await,
        };
        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.store.hub().unsubscribe(&code, subscription.id);
                return Err(err);
            }
        };

        let previous = self.sessions().insert(
            connection,
            Session {
                code: code.clone(),
                player_id: player_id.clone(),
                subscriber_id: subscription.id,
            },
        );
        if let Some(previous) = previous {
            let same_seat = previous.code == code && previous.player_id == player_id;
            self.release(connection, previous, !same_seat).await;
        }

        tracing::info!(
            connection_id = connection,
            game_id = %code,
            player_id = player_id.as_deref().unwrap_or("-"),
            "connection subscribed"
        );

        Ok(Attached {
            game_id: code,
            player_id,
            snapshot,
            subscription,
        })
    }

    /// Detach `connection` from its room, giving up its seat
    ///
    /// # Returns
    ///
    /// Whether the connection was subscribed
    pub async fn unsubscribe(&self, connection: ConnectionId) -> bool {
        let session = self.sessions().remove(&connection);
        match session {
            Some(session) => {
                self.release(connection, session, true).await;
                true
            }
            None => false,
        }
    }

    /// The hub stopped delivering to `connection`
    ///
    /// Only the subscription goes away. The connection keeps its seat until it
    /// subscribes again or disconnects, so room state is untouched.
    pub fn detach(&self, connection: ConnectionId) {
        let session = self.sessions().get(&connection).cloned();
        if let Some(session) = session {
            self.store
                .hub()
                .unsubscribe(&session.code, session.subscriber_id);
            tracing::debug!(
                connection_id = connection,
                game_id = %session.code,
                "subscription detached"
            );
        }
    }

    /// Connection is gone; never fails
    pub async fn disconnect(&self, connection: ConnectionId) {
        self.unsubscribe(connection).await;
        tracing::debug!(connection_id = connection, "connection closed");
    }

    fn seat_held_elsewhere(&self, code: &str, player_id: &str) -> bool {
        self.sessions()
            .values()
            .any(|s| s.code == code && s.player_id.as_deref() == Some(player_id))
    }

    /// Drop a session's subscription and, if asked, leave its seat
    async fn release(&self, connection: ConnectionId, session: Session, leave: bool) {
        self.store
            .hub()
            .unsubscribe(&session.code, session.subscriber_id);

        let Some(player_id) = session.player_id.filter(|_| leave) else {
            return;
        };

        // Another tab may still hold this seat
        if self.seat_held_elsewhere(&session.code, &player_id) {
            tracing::debug!(
                connection_id = connection,
                game_id = %session.code,
                %player_id,
                "seat still attached elsewhere"
            );
            return;
        }

        match self.store.leave_room(&session.code, &player_id).await {
            Ok(_) => {}
            Err(err @ (GameError::RoomNotFound(_) | GameError::PlayerNotFound(_))) => {
                tracing::debug!(
                    connection_id = connection,
                    game_id = %session.code,
                    %player_id,
                    error = %err,
                    "seat already released"
                );
            }
            Err(err) => {
                tracing::warn!(
                    connection_id = connection,
                    game_id = %session.code,
                    %player_id,
                    error = %err,
                    "failed to release seat"
                );
            }
        }
    }

    /// Number of connections currently holding a room session
    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }
}
