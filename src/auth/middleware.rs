use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::token::verify_seat_token;
use crate::{core::normalize_code, error::GameError, state::AppState};

/// Player identified by the seat token in `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct AuthenticatedPlayer {
    pub game_id: String,
    pub player_id: String,
}

/// Pull the token out of an `Authorization: Bearer` header value
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedPlayer {
    type Rejection = GameError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(GameError::InvalidToken)?;

        let claims =
            verify_seat_token(token, &state.secret_key).ok_or(GameError::InvalidToken)?;

        Ok(AuthenticatedPlayer {
            game_id: claims.game_id,
            player_id: claims.player_id,
        })
    }
}

impl AuthenticatedPlayer {
    /// Verify that the token was issued for the game named in the path
    pub fn verify_game(&self, game_id: &str) -> Result<(), GameError> {
        if self.game_id != normalize_code(game_id) {
            return Err(GameError::InvalidToken);
        }
        Ok(())
    }
}
