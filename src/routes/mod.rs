pub mod game;
pub mod health;
pub mod websocket;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    config::Settings,
    middleware::{rate_limit_middleware, security_headers_middleware},
    state::AppState,
};

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// The full application: every route plus the middleware stack
pub fn app(state: AppState) -> Router {
    let settings = state.settings.clone();

    Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ping", get(health::ping))
        // Games
        .route("/games", post(game::create_game))
        .route(
            "/games/:game_id",
            get(game::get_game).delete(game::delete_game),
        )
        .route("/games/:game_id/join", post(game::join_game))
        .route("/games/:game_id/start", post(game::start_game))
        .route("/games/:game_id/end", post(game::end_game))
        .route("/games/:game_id/leave", post(game::leave_game))
        .route("/games/:game_id/team", post(game::switch_team))
        // Real-time
        .route("/ws", get(websocket::websocket_handler))
        .route("/ws/:game_id", get(websocket::game_websocket_handler))
        // Middleware layers (outermost first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(&settings))
                .layer(middleware::from_fn(security_headers_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    rate_limit_middleware,
                ))
                .layer(TimeoutLayer::new(settings.request_timeout)),
        )
        .with_state(state)
}
