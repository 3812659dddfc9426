use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::IntoResponse,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    auth::verify_seat_token,
    core::{normalize_code, RoomSnapshot, Subscription, MAX_CLIENT_MESSAGE_BYTES},
    error::GameError,
    models::{ClientMessage, ServerMessage},
    services::{ConnectionId, SessionGateway},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    pub token: Option<String>,
}

/// Real-time channel; the client picks a room with a `subscribe` message
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.gateway, None))
}

/// Real-time channel already pointed at one room
///
/// # Arguments
///
/// * `game_id` - Game code from path
/// * `query` - Optional `token` reclaiming a seat
/// * `ws` - WebSocket upgrade request
/// * `state` - Shared application state
///
/// # Returns
///
/// WebSocket upgrade, or an HTTP error if the room or token is bad
pub async fn game_websocket_handler(
    Path(game_id): Path<String>,
    Query(query): Query<SubscribeQuery>,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GameError> {
    let code = normalize_code(&game_id);

    // Reject before upgrading so the client sees a plain HTTP status
    if let Some(token) = &query.token {
        let claims =
            verify_seat_token(token, &state.secret_key).ok_or(GameError::InvalidToken)?;
        if claims.game_id != code {
            return Err(GameError::InvalidToken);
        }
    }
    state.store.get_room(&code).await?;

    tracing::debug!(game_id = %code, seated = query.token.is_some(), "websocket accepted");

    let initial = Some((code, query.token));
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state.gateway, initial)))
}

/// One connection's view of its subscription
struct ClientSession {
    id: ConnectionId,
    gateway: Arc<SessionGateway>,
    subscription: Option<Subscription>,
    /// Highest snapshot version already sent
    last_version: u64,
}

impl ClientSession {
    fn new(gateway: Arc<SessionGateway>) -> Self {
        Self {
            id: gateway.connect(),
            gateway,
            subscription: None,
            last_version: 0,
        }
    }

    async fn subscribe(&mut self, game_id: &str, token: Option<&str>) -> Vec<ServerMessage> {
        match self.gateway.subscribe(self.id, game_id, token).await {
            Ok(attached) => {
                self.last_version = attached.snapshot.version;
                self.subscription = Some(attached.subscription);
                vec![
                    ServerMessage::Subscribed {
                        game_id: attached.game_id,
                        player_id: attached.player_id,
                    },
                    ServerMessage::StateUpdate {
                        data: attached.snapshot,
                    },
                ]
            }
            Err(err) => {
                tracing::debug!(connection_id = self.id, error = %err, "subscribe rejected");
                vec![ServerMessage::from(&err)]
            }
        }
    }

    async fn unsubscribe(&mut self) -> ServerMessage {
        self.subscription = None;
        self.last_version = 0;
        self.gateway.unsubscribe(self.id).await;
        ServerMessage::Unsubscribed
    }

    /// The hub stopped delivering; keep the seat, drop the subscription
    fn detach(&mut self) -> ServerMessage {
        self.subscription = None;
        self.last_version = 0;
        self.gateway.detach(self.id);
        ServerMessage::Unsubscribed
    }

    /// Handle one text frame from the client
    async fn handle_text(&mut self, text: &str) -> Vec<ServerMessage> {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(err) => {
                return vec![ServerMessage::from(&GameError::MalformedRequest(
                    err.to_string(),
                ))]
            }
        };

        match message {
            ClientMessage::Subscribe {
                game_id,
                player_token,
            } => self.subscribe(&game_id, player_token.as_deref()).await,
            ClientMessage::Unsubscribe => vec![self.unsubscribe().await],
            ClientMessage::Ping => vec![ServerMessage::Pong],
        }
    }

    /// Turn a queued snapshot into a frame, skipping ones already sent
    fn accept(&mut self, snapshot: Arc<RoomSnapshot>) -> Option<ServerMessage> {
        if snapshot.version <= self.last_version {
            return None;
        }
        self.last_version = snapshot.version;
        Some(ServerMessage::StateUpdate { data: snapshot })
    }
}

/// Wait for the next snapshot; pending forever while unsubscribed
async fn next_update(subscription: &mut Option<Subscription>) -> Option<Arc<RoomSnapshot>> {
    match subscription {
        Some(subscription) => subscription.receiver.recv().await,
        None => std::future::pending().await,
    }
}

enum Event {
    Incoming(Option<Result<Message, axum::Error>>),
    Update(Option<Arc<RoomSnapshot>>),
}

async fn send_all(
    sender: &mut SplitSink<WebSocket, Message>,
    messages: Vec<ServerMessage>,
) -> bool {
    for message in messages {
        if sender.send(Message::Text(message.to_text())).await.is_err() {
            return false;
        }
    }
    true
}

/// Drive one WebSocket connection until either side goes away
async fn handle_socket(
    socket: WebSocket,
    gateway: Arc<SessionGateway>,
    initial: Option<(String, Option<String>)>,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = ClientSession::new(gateway);
    let connection_id = session.id;

    if let Some((game_id, token)) = initial {
        let replies = session.subscribe(&game_id, token.as_deref()).await;
        if !send_all(&mut sender, replies).await {
            session.gateway.disconnect(connection_id).await;
            return;
        }
    }

    loop {
        let event = tokio::select! {
            incoming = receiver.next() => Event::Incoming(incoming),
            update = next_update(&mut session.subscription) => Event::Update(update),
        };

        let replies = match event {
            Event::Incoming(Some(Ok(Message::Text(text)))) => {
                if text.len() > MAX_CLIENT_MESSAGE_BYTES {
                    tracing::warn!(
                        connection_id,
                        bytes = text.len(),
                        "client message too large"
                    );
                    let err = GameError::MalformedRequest("message too large".to_string());
                    send_all(&mut sender, vec![ServerMessage::from(&err)]).await;
                    break;
                }
                session.handle_text(&text).await
            }
            Event::Incoming(Some(Ok(Message::Binary(_)))) => {
                tracing::warn!(connection_id, "unexpected binary message");
                continue;
            }
            // Protocol-level ping/pong frames are answered by axum
            Event::Incoming(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Event::Incoming(Some(Ok(Message::Close(_)))) | Event::Incoming(None) => break,
            Event::Incoming(Some(Err(err))) => {
                tracing::debug!(connection_id, error = %err, "websocket read failed");
                break;
            }
            Event::Update(Some(snapshot)) => match session.accept(snapshot) {
                Some(message) => vec![message],
                None => continue,
            },
            Event::Update(None) => {
                // Room closed, or the hub dropped us for falling behind
                vec![session.detach()]
            }
        };

        if !send_all(&mut sender, replies).await {
            tracing::debug!(connection_id, "websocket write failed");
            break;
        }
    }

    session.gateway.disconnect(connection_id).await;
    tracing::info!(connection_id, "websocket closed");
}
