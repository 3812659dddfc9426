use serde::Serialize;
use std::sync::Arc;

use crate::core::{RoomSnapshot, StoreStats, Team};
use crate::error::GameError;

/// Returned by create and join: the caller's seat and the token that proves it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub game_id: String,
    pub player_id: String,
    pub player_token: String,
    pub team: Option<Team>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub stats: StoreStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct PongResponse {
    pub message: &'static str,
}

/// Messages pushed to real-time clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Subscribed {
        #[serde(rename = "gameId")]
        game_id: String,
        /// Absent for view-only subscriptions
        #[serde(rename = "playerId")]
        player_id: Option<String>,
    },
    StateUpdate {
        data: Arc<RoomSnapshot>,
    },
    Unsubscribed,
    Error {
        error: &'static str,
        message: String,
    },
    Pong,
}

impl From<&GameError> for ServerMessage {
    fn from(err: &GameError) -> Self {
        ServerMessage::Error {
            error: err.error_code(),
            message: err.public_message(),
        }
    }
}

impl ServerMessage {
    /// Serialize for a text frame
    pub fn to_text(&self) -> String {
        // Every variant is plain data, so serialization cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| String::from(r#"{"type":"error"}"#))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Phase, TeamCounts};
    use serde_json::json;

    #[test]
    fn test_join_response_is_camel_case() {
        let resp = JoinResponse {
            game_id: "K7F3QZ".to_string(),
            player_id: "p1".to_string(),
            player_token: "tok".to_string(),
            team: Some(Team::A),
        };

        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"gameId": "K7F3QZ", "playerId": "p1", "playerToken": "tok", "team": "A"})
        );
    }

    #[test]
    fn test_health_response_flattens_stats() {
        let resp = HealthResponse {
            status: "ok",
            stats: StoreStats {
                total_rooms: 2,
                active_rooms: 1,
                total_players: 5,
                subscribers: 3,
            },
        };

        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["totalRooms"], 2);
        assert_eq!(value["subscribers"], 3);
    }

    #[test]
    fn test_server_message_shapes() {
        let subscribed = ServerMessage::Subscribed {
            game_id: "K7F3QZ".to_string(),
            player_id: None,
        };
        assert_eq!(
            serde_json::to_value(&subscribed).unwrap(),
            json!({"type": "subscribed", "gameId": "K7F3QZ", "playerId": null})
        );

        assert_eq!(
            serde_json::to_value(ServerMessage::Pong).unwrap(),
            json!({"type": "pong"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::Unsubscribed).unwrap(),
            json!({"type": "unsubscribed"})
        );
    }

    #[test]
    fn test_state_update_wraps_snapshot() {
        let snapshot = Arc::new(RoomSnapshot {
            game_id: "K7F3QZ".to_string(),
            phase: Phase::InProgress,
            host_id: "h".to_string(),
            players: vec![],
            team_counts: TeamCounts::default(),
            team_size: 4,
            max_players: 8,
            min_players: 2,
            created_at: 0,
            version: 7,
        });

        let text = ServerMessage::StateUpdate { data: snapshot }.to_text();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "state_update");
        assert_eq!(value["data"]["phase"], "in_progress");
        assert_eq!(value["data"]["version"], 7);
    }

    #[test]
    fn test_error_message_from_game_error() {
        let msg = ServerMessage::from(&GameError::RoomNotFound("ZZZZZZ".to_string()));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["error"], "ROOM_NOT_FOUND");
    }
}
