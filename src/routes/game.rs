use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    auth::AuthenticatedPlayer,
    core::RoomSnapshot,
    error::GameError,
    models::{CreateGameRequest, JoinGameRequest, JoinResponse, SwitchTeamRequest},
    state::AppState,
};

type SnapshotResponse = Result<Json<Arc<RoomSnapshot>>, GameError>;

/// Create a new game with the caller as host
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `payload` - JSON body with `playerName` and optional `teamSize`
///
/// # Returns
///
/// 201 with the host's seat and seat token
pub async fn create_game(
    State(state): State<AppState>,
    payload: Result<Json<CreateGameRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JoinResponse>), GameError> {
    let Json(request) = payload?;
    let seat = state.gateway.create_game(request).await?;
    Ok((StatusCode::CREATED, Json(seat)))
}

/// Join a lobby by code
///
/// # Arguments
///
/// * `game_id` - Game code from path, any case
/// * `state` - Shared application state
/// * `payload` - JSON body with `playerName`
///
/// # Returns
///
/// The new player's seat and seat token
pub async fn join_game(
    Path(game_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<JoinGameRequest>, JsonRejection>,
) -> Result<Json<JoinResponse>, GameError> {
    let Json(request) = payload?;
    let seat = state.gateway.join_game(&game_id, request).await?;
    Ok(Json(seat))
}

pub async fn get_game(
    Path(game_id): Path<String>,
    State(state): State<AppState>,
) -> SnapshotResponse {
    state.gateway.game_state(&game_id).await.map(Json)
}

/// Start the game (host only)
pub async fn start_game(
    Path(game_id): Path<String>,
    State(state): State<AppState>,
    auth: AuthenticatedPlayer,
) -> SnapshotResponse {
    state.gateway.start_game(&game_id, &auth).await.map(Json)
}

/// Finish a running game (host only)
pub async fn end_game(
    Path(game_id): Path<String>,
    State(state): State<AppState>,
    auth: AuthenticatedPlayer,
) -> SnapshotResponse {
    state.gateway.end_game(&game_id, &auth).await.map(Json)
}

/// Give up the caller's seat
///
/// In the lobby the player is removed; once the game has started the seat
/// is only marked disconnected.
pub async fn leave_game(
    Path(game_id): Path<String>,
    State(state): State<AppState>,
    auth: AuthenticatedPlayer,
) -> Result<StatusCode, GameError> {
    state.gateway.leave_game(&game_id, &auth).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn switch_team(
    Path(game_id): Path<String>,
    State(state): State<AppState>,
    auth: AuthenticatedPlayer,
    payload: Result<Json<SwitchTeamRequest>, JsonRejection>,
) -> SnapshotResponse {
    let Json(request) = payload?;
    state
        .gateway
        .switch_team(&game_id, &auth, request.team)
        .await
        .map(Json)
}

/// Tear the game down (host only)
pub async fn delete_game(
    Path(game_id): Path<String>,
    State(state): State<AppState>,
    auth: AuthenticatedPlayer,
) -> Result<StatusCode, GameError> {
    state.gateway.close_game(&game_id, &auth).await?;
    Ok(StatusCode::NO_CONTENT)
}
