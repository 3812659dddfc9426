//! Error taxonomy shared by the room engine and the HTTP/WebSocket gateway.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::core::{Phase, Team};

/// Every failure a caller of the engine can observe
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("game {0} not found")]
    RoomNotFound(String),

    #[error("game {code} cannot be joined while {phase}")]
    RoomNotJoinable { code: String, phase: Phase },

    #[error("game {0} is full")]
    RoomFull(String),

    #[error("team {0} is full")]
    TeamFull(Team),

    #[error("only the host can do that")]
    NotHost,

    #[error("need at least {required} players to start, have {actual}")]
    InsufficientPlayers { required: usize, actual: usize },

    #[error("cannot {action} a game that is {from}")]
    InvalidTransition { from: Phase, action: &'static str },

    #[error("no free game code after {attempts} attempts")]
    CapacityExhausted { attempts: usize },

    #[error("{0}")]
    Validation(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("player {0} not found")]
    PlayerNotFound(String),

    #[error("invalid or expired player token")]
    InvalidToken,

    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            GameError::RoomNotFound(_) | GameError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
            GameError::RoomNotJoinable { .. }
            | GameError::RoomFull(_)
            | GameError::TeamFull(_)
            | GameError::InsufficientPlayers { .. }
            | GameError::InvalidTransition { .. } => StatusCode::CONFLICT,
            GameError::NotHost => StatusCode::FORBIDDEN,
            GameError::CapacityExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GameError::Validation(_) | GameError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            GameError::InvalidToken => StatusCode::UNAUTHORIZED,
            GameError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code sent to clients
    pub fn error_code(&self) -> &'static str {
        match self {
            GameError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            GameError::RoomNotJoinable { .. } => "ROOM_NOT_JOINABLE",
            GameError::RoomFull(_) => "ROOM_FULL",
            GameError::TeamFull(_) => "TEAM_FULL",
            GameError::NotHost => "NOT_HOST",
            GameError::InsufficientPlayers { .. } => "INSUFFICIENT_PLAYERS",
            GameError::InvalidTransition { .. } => "INVALID_TRANSITION",
            GameError::CapacityExhausted { .. } => "CAPACITY_EXHAUSTED",
            GameError::Validation(_) => "VALIDATION_ERROR",
            GameError::MalformedRequest(_) => "MALFORMED_REQUEST",
            GameError::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            GameError::InvalidToken => "INVALID_TOKEN",
            GameError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to hand to a client
    ///
    /// Internal faults are reported generically so their details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            GameError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// JSON body used by both HTTP responses and WebSocket error frames
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.error_code(),
            "message": self.public_message(),
        })
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        match &self {
            GameError::Internal(detail) => tracing::error!(%detail, "internal error"),
            GameError::CapacityExhausted { attempts } => {
                tracing::warn!(attempts, "game code space exhausted")
            }
            other => tracing::debug!(error = %other, "request rejected"),
        }

        (self.status_code(), Json(self.to_json())).into_response()
    }
}

impl From<JsonRejection> for GameError {
    fn from(rejection: JsonRejection) -> Self {
        GameError::MalformedRequest(rejection.body_text())
    }
}

pub type GameResult<T> = Result<T, GameError>;
